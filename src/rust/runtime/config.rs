// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    fail::Fail,
    limits,
};
use ::std::{
    fs,
    ops::Index,
    str::FromStr,
};
use ::yaml_rust::{
    Yaml,
    YamlLoader,
};

//======================================================================================================================
// Constants
//======================================================================================================================

// Scheduler options.
mod sched_config {
    pub const SECTION_NAME: &str = "scheduler";
    // Number of entries in the deferred task list.
    pub const MAX_DEFERRED_TASKS: &str = "max_deferred_tasks";
    // Size of the interrupt hand-off ring.
    pub const MAX_ISR_TASKS: &str = "max_isr_tasks";
    // Number of entries in the ASAP queue.
    pub const MAX_ASAP_TASKS: &str = "max_asap_tasks";
    // Number of tasks addressable from interrupt context.
    pub const MAX_TASKS: &str = "max_tasks";
    // Rate of the system clock.
    pub const TICKS_PER_SECOND: &str = "ticks_per_second";
}

//======================================================================================================================
// Structures
//======================================================================================================================

/// Scheduler configuration. Every capacity is fixed for the lifetime of a scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedConfig {
    pub max_deferred_tasks: usize,
    /// Must be a power of two. One slot is kept free, so this holds `max_isr_tasks - 1` pending tasks.
    pub max_isr_tasks: usize,
    pub max_asap_tasks: usize,
    pub max_tasks: usize,
    pub ticks_per_second: u32,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl SchedConfig {
    /// Reads a configuration file. Keys absent from the file take their default value.
    pub fn from_file(path: &str) -> Result<Self, Fail> {
        let text: String = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                let cause: String = format!("cannot read configuration file (path={:?}, error={:?})", path, e);
                error!("from_file(): {}", cause);
                return Err(Fail::new(libc::ENOENT, &cause));
            },
        };
        Self::from_yaml_str(&text)
    }

    /// Parses a YAML document. Environment variables named after an upper-cased key override the document.
    pub fn from_yaml_str(text: &str) -> Result<Self, Fail> {
        Self::parse(text, |key: &str| ::std::env::var(key.to_uppercase()).ok())
    }

    /// Checks that the configuration describes a usable scheduler.
    pub fn validate(&self) -> Result<(), Fail> {
        let capacities: [(&str, usize); 4] = [
            (sched_config::MAX_DEFERRED_TASKS, self.max_deferred_tasks),
            (sched_config::MAX_ISR_TASKS, self.max_isr_tasks),
            (sched_config::MAX_ASAP_TASKS, self.max_asap_tasks),
            (sched_config::MAX_TASKS, self.max_tasks),
        ];
        for (name, value) in capacities {
            if value == 0 {
                let cause: String = format!("parameter \"{}\" must not be zero", name);
                error!("validate(): {}", cause);
                return Err(Fail::new(libc::EINVAL, &cause));
            }
        }
        if self.max_isr_tasks < 2 || !self.max_isr_tasks.is_power_of_two() {
            let cause: String = format!(
                "parameter \"{}\" must be a power of two greater than one (value={:?})",
                sched_config::MAX_ISR_TASKS,
                self.max_isr_tasks
            );
            error!("validate(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        if self.ticks_per_second == 0 {
            let cause: String = format!("parameter \"{}\" must not be zero", sched_config::TICKS_PER_SECOND);
            error!("validate(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        Ok(())
    }

    fn parse<E>(text: &str, env: E) -> Result<Self, Fail>
    where
        E: Fn(&str) -> Option<String>,
    {
        let documents: Vec<Yaml> = match YamlLoader::load_from_str(text) {
            Ok(documents) => documents,
            Err(e) => {
                let cause: String = format!("malformed configuration ({})", e);
                error!("parse(): {}", cause);
                return Err(Fail::new(libc::EINVAL, &cause));
            },
        };
        let section: Yaml = match &documents[..] {
            [] => Yaml::Null,
            [document] => Self::get_subsection(document, sched_config::SECTION_NAME)?.clone(),
            _ => {
                let cause: String = "configuration must hold exactly one document".to_string();
                error!("parse(): {}", cause);
                return Err(Fail::new(libc::EINVAL, &cause));
            },
        };

        let defaults: Self = Self::default();
        let config: Self = Self {
            max_deferred_tasks: Self::get_int_option(
                &section,
                &env,
                sched_config::MAX_DEFERRED_TASKS,
                defaults.max_deferred_tasks,
            )?,
            max_isr_tasks: Self::get_int_option(&section, &env, sched_config::MAX_ISR_TASKS, defaults.max_isr_tasks)?,
            max_asap_tasks: Self::get_int_option(
                &section,
                &env,
                sched_config::MAX_ASAP_TASKS,
                defaults.max_asap_tasks,
            )?,
            max_tasks: Self::get_int_option(&section, &env, sched_config::MAX_TASKS, defaults.max_tasks)?,
            ticks_per_second: Self::get_int_option(
                &section,
                &env,
                sched_config::TICKS_PER_SECOND,
                defaults.ticks_per_second,
            )?,
        };
        config.validate()?;

        Ok(config)
    }

    //======================================================================================================================
    // Static Functions
    //======================================================================================================================

    /// Returns the section at `index`, or `Null` if absent. A present key must hold a mapping.
    fn get_subsection<'a>(yaml: &'a Yaml, index: &str) -> Result<&'a Yaml, Fail> {
        match yaml.index(index) {
            section @ (Yaml::Hash(_) | Yaml::BadValue | Yaml::Null) => Ok(section),
            _ => {
                let cause: String = format!("parameter \"{}\" has unexpected type", index);
                error!("get_subsection(): {}", cause);
                Err(Fail::new(libc::EINVAL, &cause))
            },
        }
    }

    /// Get value where the environment value overrides the config file if it exists.
    fn get_typed_env_option<T, E>(env: &E, index: &str) -> Result<Option<T>, Fail>
    where
        T: FromStr,
        E: Fn(&str) -> Option<String>,
    {
        match env(index) {
            Some(var) => match var.trim().parse() {
                Ok(value) => Ok(Some(value)),
                Err(_) => {
                    let cause: String = format!("parameter {} has unexpected type", index);
                    error!("get_typed_env_option(): {}", cause);
                    Err(Fail::new(libc::EINVAL, &cause))
                },
            },
            None => Ok(None),
        }
    }

    /// Reads integer `index` from the environment, then from `yaml`, falling back to `default`. Verifies that the
    /// destination type may hold the value.
    fn get_int_option<T, E>(yaml: &Yaml, env: &E, index: &str, default: T) -> Result<T, Fail>
    where
        T: TryFrom<i64> + FromStr,
        E: Fn(&str) -> Option<String>,
    {
        if let Some(value) = Self::get_typed_env_option(env, index)? {
            return Ok(value);
        }
        let val: i64 = match yaml.index(index) {
            Yaml::BadValue | Yaml::Null => return Ok(default),
            Yaml::Integer(val) => *val,
            _ => {
                let cause: String = format!("parameter {} has unexpected type", index);
                error!("get_int_option(): {}", cause);
                return Err(Fail::new(libc::EINVAL, &cause));
            },
        };
        match T::try_from(val) {
            Ok(val) => Ok(val),
            _ => {
                let cause: String = format!("parameter \"{}\" is out of range", index);
                error!("get_int_option(): {}", cause);
                Err(Fail::new(libc::ERANGE, &cause))
            },
        }
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            max_deferred_tasks: limits::MAX_DEFERRED_TASKS,
            max_isr_tasks: limits::MAX_ISR_TASKS,
            max_asap_tasks: limits::MAX_ASAP_TASKS,
            max_tasks: limits::MAX_TASKS,
            ticks_per_second: limits::TICKS_PER_SECOND,
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
