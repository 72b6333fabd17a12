use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

/// Run configuration of the nested-program layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rewrite `CHEX[...]`-style calls before evaluation.
    pub rewrite: bool,
    /// Learn support sets for the cautious and brave modes.
    pub support_sets: bool,
    /// Re-encode input literals of learned support sets into the
    /// higher-order input encoding instead of keeping them verbatim.
    pub encode_support_set_inputs: bool,
    // upper bound on atoms guessed by the reference solver (2^n guesses)
    pub max_choice_atoms: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rewrite: false,
            support_sets: false,
            encode_support_set_inputs: false,
            max_choice_atoms: 20,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Consumes the options this layer understands and leaves the others in
    /// place: `--nestedhex` enables the surface syntax and `--supportsets`
    /// enables support-set learning.
    pub fn process_options(&mut self, options: &mut Vec<String>) {
        options.retain(|option| match option.as_str() {
            "--nestedhex" => {
                self.rewrite = true;
                false
            }
            "--supportsets" => {
                self.support_sets = true;
                false
            }
            _ => true,
        });
        info!(
            "Nested programs: rewrite={}, support_sets={}",
            self.rewrite, self.support_sets
        );
    }
}
