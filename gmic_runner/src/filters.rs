//! Catalog of the G'MIC filters that can be run by name.

use serde::Serialize;

use crate::command::FilterCommand;
use crate::error::{RunnerError, RunnerResult};
use crate::params::{Choice, ParamSpec, ParamValue, ParamValues, encode};

/// How a filter turns its parameters into a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStyle {
    /// `verb arg,arg,...`
    Positional,
    /// The single text parameter is the whole command.
    Verbatim,
}

/// A filter: operation name, G'MIC verb and parameter schema.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FilterSchema {
    /// Operation name, e.g. `gmic:cartoon`.
    pub name: &'static str,
    /// G'MIC command verb.
    pub verb: &'static str,
    pub title: &'static str,
    pub style: CommandStyle,
    pub merge_layers: bool,
    pub params: &'static [ParamSpec],
}

impl FilterSchema {
    pub fn defaults(&self) -> ParamValues {
        ParamValues::defaults(self.verb, self.params)
    }

    pub fn values_from_json(&self, json: &serde_json::Value) -> RunnerResult<ParamValues> {
        ParamValues::from_json(self.verb, self.params, json)
    }

    /// Command for `values`, which must come from this schema.
    pub fn command(&self, values: &ParamValues) -> FilterCommand {
        let base = match self.style {
            CommandStyle::Positional if values.values().is_empty() => self.verb.to_owned(),
            CommandStyle::Positional => format!("{} {}", self.verb, encode(values)),
            CommandStyle::Verbatim => match values.values().first() {
                Some(ParamValue::Text(cmd)) => cmd.clone(),
                _ => String::new(),
            },
        };
        FilterCommand::new(base).merge_layers(self.merge_layers)
    }
}

const METALS: &[Choice] = &[
    Choice::new("silver", "Silver"),
    Choice::new("gold", "Gold"),
    Choice::new("copper", "Copper"),
    Choice::new("bronze", "Bronze"),
    Choice::new("blue-steel", "Blue Steel"),
];

const SHAPES: &[Choice] = &[
    Choice::new("procedural", "Procedural"),
    Choice::new("opaque-regions-on-top-layer", "Opaque Regions on Top Layer"),
];

const FONTS: &[Choice] = &[
    Choice::new("acme", "Acme"),
    Choice::new("arial", "Arial"),
    Choice::new("arial-black", "Arial Black"),
    Choice::new("black-ops-one", "Black Ops One"),
    Choice::new("black-chancery", "Black Chancery"),
    Choice::new("cabin-sketch", "Cabin Sketch"),
    Choice::new("caprasimo", "Caprasimo"),
    Choice::new("carnevalee-freakshow", "Carnevalee Freakshow"),
    Choice::new("cheese-burger", "Cheese Burger"),
    Choice::new("cheque", "Cheque"),
    Choice::new("cheque-black", "Cheque Black"),
    Choice::new("chlorinar", "Chlorinar"),
    Choice::new("comic-sans-ms", "Comic Sans MS"),
    Choice::new("courier-new", "Courier New"),
    Choice::new("creepster", "Creepster"),
    Choice::new("georgia", "Georgia"),
    Choice::new("hidayatullah", "Hidayatullah"),
    Choice::new("impact", "Impact"),
    Choice::new("jaro", "Jaro"),
    Choice::new("lobster", "Lobster"),
    Choice::new("luckiest-guy", "Luckiest Guy"),
    Choice::new("macondo", "Macondo"),
    Choice::new("medieval-sharp", "Medieval Sharp"),
    Choice::new("odin-rounded", "Odin Rounded"),
    Choice::new("oswald", "Oswald"),
    Choice::new("palatino-linotype", "Palatino Linotype"),
    Choice::new("playfair-display", "Playfair Display"),
    Choice::new("roboto", "Roboto"),
    Choice::new("satisfy", "Satisfy"),
    Choice::new("sofia", "Sofia"),
    Choice::new("sunday-milk", "Sunday Milk"),
    Choice::new("tex-gyre-adventor", "Tex Gyre Adventor"),
    Choice::new("times-new-roman", "Times New Roman"),
    Choice::new("titan-one", "Titan One"),
    Choice::new("typewriter", "Typewriter"),
    Choice::new("verdana", "Verdana"),
];

const LIGHTNESS: &[Choice] = &[
    Choice::new("darker", "Darker"),
    Choice::new("brighter", "Brighter"),
];

pub const COMMAND: FilterSchema = FilterSchema {
    name: "gmic:command",
    verb: "command",
    title: "Run G'MIC command",
    style: CommandStyle::Verbatim,
    merge_layers: true,
    params: &[ParamSpec::text("command", "G'MIC Command", "")],
};

pub const CARTOON: FilterSchema = FilterSchema {
    name: "gmic:cartoon",
    verb: "cartoon",
    title: "Cartoon",
    style: CommandStyle::Positional,
    merge_layers: true,
    params: &[
        ParamSpec::float("smoothness", "Smoothness", 0.0, 10.0, 3.0),
        ParamSpec::float("sharpening", "Sharpening", 0.0, 400.0, 200.0),
        ParamSpec::float("edge_threshold", "Edge Threshold", 1.0, 30.0, 20.0),
        ParamSpec::float("edge_thickness", "Edge Thickness", 0.0, 1.0, 0.25),
        ParamSpec::float("color_strength", "Color Strength", 0.0, 3.0, 1.5),
        ParamSpec::int("color_quantization", "Color Quantization", 2, 256, 8),
    ],
};

pub const METALLIC: FilterSchema = FilterSchema {
    name: "gmic:fx_tk_metallic",
    verb: "fx_tk_metallic",
    title: "Metallic Look",
    style: CommandStyle::Positional,
    merge_layers: true,
    params: &[
        ParamSpec::float("strength", "Strength", 0.0, 1.0, 1.0),
        ParamSpec::float("smoothness", "Smoothness", 0.0, 20.0, 0.0),
        ParamSpec::choice("metal", "Metal", METALS, 0),
    ],
};

pub const DROP_WATER: FilterSchema = FilterSchema {
    name: "gmic:fx_drop_water",
    verb: "fx_drop_water",
    title: "Drop Water",
    style: CommandStyle::Positional,
    merge_layers: true,
    params: &[
        ParamSpec::choice("shapes", "Shapes", SHAPES, 0),
        ParamSpec::float("density", "Density", 0.0, 100.0, 20.0),
        ParamSpec::float("radius", "Radius", 0.0, 5.0, 2.0),
        ParamSpec::float("variability", "Variability", 0.0, 100.0, 80.0),
        ParamSpec::int("random_seed", "Random Seed", 0, 16384, 0),
        ParamSpec::float("refraction", "Refraction", 0.0, 20.0, 3.0),
        ParamSpec::float("light_angle", "Light Angle", 0.0, 360.0, 35.0),
        ParamSpec::float("specular_size", "Specular Size", 0.0, 100.0, 10.0),
        ParamSpec::float("specular_intensity", "Specular Intensity", 0.0, 1.0, 1.0),
        ParamSpec::float("specular_centering", "Specular Centering", 0.0, 1.0, 0.5),
        ParamSpec::float("shadow_size", "Shadow Size", 0.0, 3.0, 0.25),
        ParamSpec::float("shadow_intensity", "Shadow Intensity", 0.0, 1.0, 0.5),
        ParamSpec::float("shadow_smoothness", "Shadow Smoothness", 0.0, 3.0, 0.75),
        ParamSpec::float("diffuse_shadow", "Diffuse Shadow", 0.0, 3.0, 0.05),
        ParamSpec::float("smoothness", "Smoothness", 0.0, 3.0, 0.15),
        ParamSpec::boolean("output_as_separate_layers", "Output as Separate Layers", true),
    ],
};

pub const WATERMARK_VISIBLE: FilterSchema = FilterSchema {
    name: "gmic:fx_watermark_visible",
    verb: "fx_watermark_visible",
    title: "Visible Watermark",
    style: CommandStyle::Positional,
    merge_layers: true,
    params: &[
        ParamSpec::text("text", "Text", "\\251 G'MIC"),
        ParamSpec::float("opacity", "Opacity", 0.0, 1.0, 0.4),
        ParamSpec::choice("font", "Font", FONTS, 27),
        ParamSpec::int("size", "Size", 13, 512, 50),
        ParamSpec::boolean("bold_face", "Bold Face", false),
        ParamSpec::float("angle", "Angle", 0.0, 360.0, 25.0),
        ParamSpec::choice("lightness", "Lightness", LIGHTNESS, 1),
        ParamSpec::float("smoothness", "Smoothness", 0.0, 5.0, 0.5),
    ],
};

/// Every registered filter.
pub const ALL: &[FilterSchema] = &[COMMAND, CARTOON, METALLIC, DROP_WATER, WATERMARK_VISIBLE];

/// Looks a filter up by operation name (`gmic:cartoon`) or verb (`cartoon`).
pub fn find(name: &str) -> RunnerResult<&'static FilterSchema> {
    ALL.iter()
        .find(|f| f.name == name || f.verb == name)
        .ok_or_else(|| RunnerError::UnknownFilter(name.to_owned()))
}
