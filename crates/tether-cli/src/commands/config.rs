//! `tether config`: print the effective configuration

use clap::ValueEnum;

use crate::config::TetherConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Toml,
    Json,
}

pub fn render(config: &TetherConfig, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Toml => toml::to_string_pretty(config)?,
        Format::Json => serde_json::to_string_pretty(config)?,
    })
}

pub fn execute(config: &TetherConfig, format: Format) -> anyhow::Result<()> {
    println!("{}", render(config, format)?.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_output_reparses() {
        let mut config = TetherConfig::default();
        config.heap.relocate_on_write = true;
        let text = render(&config, Format::Toml).unwrap();
        assert!(text.contains("[binding]"));
        assert_eq!(TetherConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_json_output() {
        let text = render(&TetherConfig::default(), Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["binding"]["max_propagation_depth"], 64);
        assert_eq!(value["heap"]["relocate_on_write"], false);
    }
}
