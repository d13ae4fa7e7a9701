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


use std::process::ExitCode;
use attribution::app::args::{consume_args, AttributionArgs, ConsumedArgs};
use attribution::app::commands;
use attribution::app::logging::configure_logging;
use attribution::config::Configs;
use clap::Parser;

fn main() -> ExitCode {
    let consumed = match consume_args(AttributionArgs::parse()) {
        Ok(consumed) => consumed,
        Err(err) => {
            eprintln!("Failed to load the config: {err}");
            return ExitCode::from(2)
        }
    };
    let result = match consumed {
        ConsumedArgs::Train(job, configs) => {
            init_logging(&configs);
            commands::train(job, &configs)
        }
        ConsumedArgs::Predict(job, configs) => {
            init_logging(&configs);
            commands::predict(job, &configs)
        }
        ConsumedArgs::Nothing => Ok(()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("Error: {err}");
            err.into()
        }
    }
}

fn init_logging(configs: &Configs) {
    if let Err(err) = configure_logging(configs) {
        eprintln!("Failed to configure the logging: {err}");
    }
}
