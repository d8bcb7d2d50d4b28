//! Assembly of the command line actually sent to G'MIC.

/// Stores the width and height of the first image in `_gr_w` / `_gr_h`.
pub const CAPTURE_SIZE_PREFIX: &str = "_gr_w={0,w} _gr_h={0,h}";
/// Flattens every result layer into one image.
pub const MERGE_LAYERS_SUFFIX: &str = "gui_merge_layers";
/// Resizes the result back to the size captured by [`CAPTURE_SIZE_PREFIX`].
pub const RESAMPLE_SUFFIX: &str = "resize $_gr_w,$_gr_h";

/// An immutable filter invocation: base command plus modifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterCommand {
    base: String,
    resample: bool,
    merge_layers: bool,
}

impl FilterCommand {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            resample: false,
            merge_layers: false,
        }
    }

    /// Resize the final output to the input's dimensions.
    pub fn resample(mut self, yes: bool) -> Self {
        self.resample = yes;
        self
    }

    /// Merge multiple result layers into a single image.
    pub fn merge_layers(mut self, yes: bool) -> Self {
        self.merge_layers = yes;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_empty(&self) -> bool {
        self.base.trim().is_empty()
    }

    /// Renders `[capture] base [merge] [resample]`, space separated.
    pub fn assemble(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if self.resample {
            parts.push(CAPTURE_SIZE_PREFIX);
        }
        parts.push(self.base.as_str());
        if self.merge_layers {
            parts.push(MERGE_LAYERS_SUFFIX);
        }
        if self.resample {
            parts.push(RESAMPLE_SUFFIX);
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_command_is_untouched() {
        let cmd = FilterCommand::new("cartoon 3.0,200.0");
        assert_eq!(cmd.assemble(), "cartoon 3.0,200.0");
    }

    #[test]
    fn merge_only_appends_suffix() {
        let cmd = FilterCommand::new("negate").merge_layers(true);
        assert_eq!(cmd.assemble(), "negate gui_merge_layers");
    }

    #[test]
    fn full_assembly_uses_fixed_order() {
        let cmd = FilterCommand::new("cartoon 3.0,200.0")
            .resample(true)
            .merge_layers(true);
        assert_eq!(
            cmd.assemble(),
            "_gr_w={0,w} _gr_h={0,h} cartoon 3.0,200.0 gui_merge_layers resize $_gr_w,$_gr_h"
        );
    }

    #[test]
    fn resample_without_merge() {
        let cmd = FilterCommand::new("rotate 90").resample(true);
        assert_eq!(
            cmd.assemble(),
            "_gr_w={0,w} _gr_h={0,h} rotate 90 resize $_gr_w,$_gr_h"
        );
    }

    #[test]
    fn blank_base_is_empty() {
        assert!(FilterCommand::new("  ").is_empty());
        assert!(!FilterCommand::new("negate").is_empty());
    }
}
