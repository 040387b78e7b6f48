use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_host: String,
    pub bind_port: u16,
    pub name_service: String,
    pub peer_type: String,
    pub store_file: String,
}

impl Config {
    pub fn from_file(file: ConfigFile) -> Config {
        let mut base: Config = Default::default();
        if let Some(h) = file.bind_host {
            base.bind_host = h
        }
        if let Some(p) = file.bind_port {
            base.bind_port = p
        }
        if let Some(ns) = file.name_service {
            base.name_service = ns
        }
        if let Some(t) = file.peer_type {
            base.peer_type = t
        }
        if let Some(s) = file.store_file {
            base.store_file = s
        }
        base
    }
}

#[derive(Serialize, Deserialize, Default)]
pub struct ConfigFile {
    pub bind_host: Option<String>,
    pub bind_port: Option<u16>,
    pub name_service: Option<String>,
    pub peer_type: Option<String>,
    pub store_file: Option<String>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            bind_host: "".to_owned(),
            bind_port: 0,
            name_service: "127.0.0.1:9500".to_owned(),
            peer_type: "fortune".to_owned(),
            store_file: "./fortunes.db".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_overrides_only_present_fields() {
        let file = ConfigFile {
            bind_port: Some(9000),
            ..Default::default()
        };
        let cfg = Config::from_file(file);
        assert_eq!(cfg.bind_port, 9000);
        assert_eq!(cfg.name_service, "127.0.0.1:9500");
    }
}
