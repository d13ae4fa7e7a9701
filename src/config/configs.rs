//Copyright 2024 Felix Engl
//
//Licensed under the Apache License, Version 2.0 (the "License");
//you may not use this file except in compliance with the License.
//You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
//Unless required by applicable law or agreed to in writing, software
//distributed under the License is distributed on an "AS IS" BASIS,
//WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//See the License for the specific language governing permissions and
//limitations under the License.


use camino::Utf8Path;
use config::Config;
use serde::{Deserialize, Serialize};
use crate::config::{AnalyzerConfig, SystemConfig};

/// A collection of all config used in an analysis run.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename(serialize = "Config"))]
pub struct Configs {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

impl Configs {
    pub fn new(system: SystemConfig, analyzer: AnalyzerConfig) -> Self {
        Self { system, analyzer }
    }

    /// Loads `attribution.*` from the working directory and from `folder`,
    /// the latter wins. Variables like `ATTRIBUTION.SYSTEM.LOG_LEVEL` win over both.
    pub fn load_from<P: AsRef<Utf8Path>>(folder: P) -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("./attribution").required(false))
            .add_source(config::File::with_name(
                folder.as_ref().join("attribution").as_str(),
            ))
            .add_source(config::Environment::with_prefix("ATTRIBUTION").separator("."))
            .build()?
            .try_deserialize()
    }

    pub fn discover_or_default() -> Result<Self, config::ConfigError> {
        match Config::builder()
            .add_source(config::File::with_name("./attribution"))
            .add_source(config::File::with_name("./model/attribution").required(false))
            .add_source(config::Environment::with_prefix("ATTRIBUTION").separator("."))
            .build()
        {
            Ok(value) => value.try_deserialize(),
            Err(_) => Ok(Default::default()),
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs::File;
    use std::io::{BufWriter, Write};
    use crate::config::Configs;

    #[test]
    fn can_load_config_from_folder() {
        let dir = camino_tempfile::tempdir().unwrap();
        let mut config = Configs::default();
        config.analyzer.max_words = 42;
        config.analyzer.use_sentiment = false;
        config.system.log_level = log::LevelFilter::Debug;

        let mut writer = BufWriter::new(File::create(dir.path().join("attribution.json")).unwrap());
        write!(&mut writer, "{}", serde_json::to_string(&config).unwrap()).unwrap();
        drop(writer);

        let loaded = Configs::load_from(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn missing_folder_config_is_an_error() {
        let dir = camino_tempfile::tempdir().unwrap();
        assert!(Configs::load_from(dir.path().join("nothing")).is_err());
    }
}
