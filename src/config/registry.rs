// Typed setting registry
//
// Maps dotted setting names ("qc.min_quality") to a getter and a typed
// setter. `config edit` and `config show` go through this table, so every
// editable setting and every way an edit can fail is listed here.

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::Settings;

/// Errors from editing a setting by name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Invalid value '{value}' for {setting}: {reason}")]
    InvalidValue {
        setting: String,
        value: String,
        reason: String,
    },
}

/// The type a setting's value is parsed as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Integer,
    Float,
    Text,
    Path,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "number",
            ValueKind::Text => "text",
            ValueKind::Path => "path",
        };
        f.write_str(name)
    }
}

type Getter = fn(&Settings) -> String;
type Setter = fn(&mut Settings, &str) -> Result<(), String>;

/// One editable setting
#[derive(Clone, Copy)]
pub struct SettingEntry {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ValueKind,
    get: Getter,
    set: Setter,
}

impl SettingEntry {
    /// Current value rendered as text.
    pub fn value(&self, settings: &Settings) -> String {
        (self.get)(settings)
    }
}

impl fmt::Debug for SettingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingEntry")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered table of every editable setting.
#[derive(Debug, Clone, Default)]
pub struct SettingsRegistry {
    entries: IndexMap<&'static str, SettingEntry>,
}

impl SettingsRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of all [`Settings`] fields, in display order.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register("threads", "Threads", ValueKind::Integer, |s| s.threads.to_string(), |s, v| {
                s.threads = parse_threads(v)?;
                Ok(())
            })
            .register("verbose", "Verbose", ValueKind::Bool, |s| s.verbose.to_string(), |s, v| {
                s.verbose = parse_bool(v)?;
                Ok(())
            })
            .register(
                "timeout_secs",
                "Stage Timeout (s)",
                ValueKind::Integer,
                |s| s.timeout_secs.to_string(),
                |s, v| {
                    s.timeout_secs = parse_number(v)?;
                    Ok(())
                },
            )
            .register("data_dir", "Data Directory", ValueKind::Path, |s| s.data_dir.to_string(), |s, v| {
                s.data_dir = parse_path(v)?;
                Ok(())
            })
            .register("temp_dir", "Temp Directory", ValueKind::Path, |s| s.temp_dir.to_string(), |s, v| {
                s.temp_dir = parse_path(v)?;
                Ok(())
            })
            .register("qc.tool", "QC Tool", ValueKind::Text, |s| s.qc.tool.clone(), |s, v| {
                s.qc.tool = parse_text(v)?;
                Ok(())
            })
            .register(
                "qc.min_quality",
                "Min Quality",
                ValueKind::Integer,
                |s| s.qc.min_quality.to_string(),
                |s, v| {
                    s.qc.min_quality = parse_number(v)?;
                    Ok(())
                },
            )
            .register(
                "qc.min_length",
                "Min Length",
                ValueKind::Integer,
                |s| s.qc.min_length.to_string(),
                |s, v| {
                    s.qc.min_length = parse_number(v)?;
                    Ok(())
                },
            )
            .register("qc.max_n", "Max N", ValueKind::Integer, |s| s.qc.max_n.to_string(), |s, v| {
                s.qc.max_n = parse_number(v)?;
                Ok(())
            })
            .register("denoise.tool", "Denoise Tool", ValueKind::Text, |s| s.denoise.tool.clone(), |s, v| {
                s.denoise.tool = parse_text(v)?;
                Ok(())
            })
            .register(
                "denoise.min_reads",
                "Min Reads",
                ValueKind::Integer,
                |s| s.denoise.min_reads.to_string(),
                |s, v| {
                    s.denoise.min_reads = parse_number(v)?;
                    Ok(())
                },
            )
            .register(
                "denoise.max_ee",
                "Max EE",
                ValueKind::Float,
                |s| s.denoise.max_ee.to_string(),
                |s, v| {
                    s.denoise.max_ee = parse_max_ee(v)?;
                    Ok(())
                },
            );
        registry
    }

    /// Add a setting.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered, is not a lowercase dotted
    /// identifier, or if the setter rejects the getter's rendering of the
    /// default value (the getter and setter disagree on the type).
    pub fn register(
        &mut self,
        name: &'static str,
        label: &'static str,
        kind: ValueKind,
        get: Getter,
        set: Setter,
    ) -> &mut Self {
        assert!(is_setting_name(name), "invalid setting name: {name:?}");
        assert!(
            !self.entries.contains_key(name),
            "setting registered twice: {name}"
        );

        let mut probe = Settings::default();
        let rendered = get(&probe);
        if let Err(reason) = set(&mut probe, &rendered) {
            panic!("setting {name} cannot round-trip its default {rendered:?}: {reason}");
        }

        self.entries.insert(
            name,
            SettingEntry {
                name,
                label,
                kind,
                get,
                set,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&SettingEntry> {
        self.entries.get(name)
    }

    /// All settings in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &SettingEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse `value` and store it in the setting called `name`.
    ///
    /// On error `settings` is left unchanged.
    pub fn apply(&self, settings: &mut Settings, name: &str, value: &str) -> Result<(), EditError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| EditError::UnknownSetting(name.to_string()))?;

        (entry.set)(settings, value).map_err(|reason| EditError::InvalidValue {
            setting: name.to_string(),
            value: value.to_string(),
            reason,
        })?;

        tracing::debug!("Set {} = {}", name, value);
        Ok(())
    }

    /// Check every registered setting's current value against its own setter.
    ///
    /// Settings read from a file bypass [`apply`](Self::apply); this reports
    /// the first value an edit would have refused.
    pub fn validate(&self, settings: &Settings) -> Result<(), EditError> {
        let mut scratch = settings.clone();
        for entry in self.entries.values() {
            let value = entry.value(settings);
            (entry.set)(&mut scratch, &value).map_err(|reason| EditError::InvalidValue {
                setting: entry.name.to_string(),
                value,
                reason,
            })?;
        }
        Ok(())
    }
}

fn is_setting_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        })
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("expected a {}", ValueKind::Bool)),
    }
}

fn parse_number<T>(value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e| format!("{}", e))
}

fn parse_threads(value: &str) -> Result<usize, String> {
    match parse_number(value)? {
        0 => Err("thread count must be at least 1".to_string()),
        threads => Ok(threads),
    }
}

fn parse_max_ee(value: &str) -> Result<f64, String> {
    let max_ee: f64 = parse_number(value)?;
    if max_ee.is_finite() && max_ee >= 0.0 {
        Ok(max_ee)
    } else {
        Err("expected a finite, non-negative number".to_string())
    }
}

fn parse_text(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err("value must not be empty".to_string())
    } else {
        Ok(value.to_string())
    }
}

fn parse_path(value: &str) -> Result<Utf8PathBuf, String> {
    parse_text(value).map(Utf8PathBuf::from)
}
