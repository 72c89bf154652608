use serde::de::DeserializeOwned;

use crate::error::PluginError;

/// Deserialize a plugin config table into the plugin's typed config.
///
/// `config` is format-independent JSON, already converted from TOML by the host.
pub fn parse_plugin_config<T: DeserializeOwned>(config: &serde_json::Value) -> Result<T, PluginError> {
    if !config.is_object() {
        return Err(PluginError::config("plugin config must be a table/object"));
    }
    serde_json::from_value(config.clone())
        .map_err(|e| PluginError::config(format!("invalid plugin config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, serde::Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        size: u64,
    }

    #[test]
    fn parses_object() {
        let cfg: Sample = parse_plugin_config(&json!({"name": "x"})).unwrap();
        assert_eq!(cfg.name, "x");
        assert_eq!(cfg.size, 0);
    }

    #[test]
    fn rejects_non_object() {
        let err = parse_plugin_config::<Sample>(&json!([1])).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Config);
    }

    #[test]
    fn missing_required_is_config_error() {
        let err = parse_plugin_config::<Sample>(&json!({})).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Config);
        assert!(err.message.contains("name"));
    }
}
