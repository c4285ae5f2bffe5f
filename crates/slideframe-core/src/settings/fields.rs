//! Static field table: settings field name → typed accessor.
//!
//! The control API addresses settings by name (`?rotation=90`).  Instead of
//! looking fields up at runtime through reflection, every settable field is
//! listed once in [`FIELDS`] together with a getter and a setter of the
//! field's declared type.  The table is built at compile time; lookups are a
//! linear scan over a dozen entries.
//!
//! `remote_clients` is deliberately absent: it is a list, managed through the
//! device registration endpoints rather than the scalar applier.

use super::schema::Settings;

/// Declared type of a settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Double,
    Text,
    Boolean,
}

/// A typed value read from (or written to) a settings field.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Integer(i32),
    Float(f32),
    Double(f64),
    Text(String),
    Boolean(bool),
}

impl SettingValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            SettingValue::Integer(_) => FieldKind::Integer,
            SettingValue::Float(_) => FieldKind::Float,
            SettingValue::Double(_) => FieldKind::Double,
            SettingValue::Text(_) => FieldKind::Text,
            SettingValue::Boolean(_) => FieldKind::Boolean,
        }
    }

    /// Renders the value in the textual form the applier accepts.
    ///
    /// Booleans become `on` / `off`: the applier only treats `ON` as true, so
    /// `true` would silently turn into `false` on the receiving frame.
    pub fn to_wire(&self) -> String {
        match self {
            SettingValue::Integer(v) => v.to_string(),
            SettingValue::Float(v) => v.to_string(),
            SettingValue::Double(v) => v.to_string(),
            SettingValue::Text(v) => v.clone(),
            SettingValue::Boolean(true) => "on".to_string(),
            SettingValue::Boolean(false) => "off".to_string(),
        }
    }
}

/// Typed getter/setter pair for one field.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Accessor {
    Integer {
        get: fn(&Settings) -> i32,
        set: fn(&mut Settings, i32),
    },
    Float {
        get: fn(&Settings) -> f32,
        set: fn(&mut Settings, f32),
    },
    Double {
        get: fn(&Settings) -> f64,
        set: fn(&mut Settings, f64),
    },
    Text {
        get: fn(&Settings) -> String,
        set: fn(&mut Settings, String),
    },
    Boolean {
        get: fn(&Settings) -> bool,
        set: fn(&mut Settings, bool),
    },
}

/// One entry of the field table.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub(crate) accessor: Accessor,
}

impl FieldDescriptor {
    pub fn kind(&self) -> FieldKind {
        match self.accessor {
            Accessor::Integer { .. } => FieldKind::Integer,
            Accessor::Float { .. } => FieldKind::Float,
            Accessor::Double { .. } => FieldKind::Double,
            Accessor::Text { .. } => FieldKind::Text,
            Accessor::Boolean { .. } => FieldKind::Boolean,
        }
    }

    /// Reads the field's current value out of `settings`.
    pub fn read(&self, settings: &Settings) -> SettingValue {
        match self.accessor {
            Accessor::Integer { get, .. } => SettingValue::Integer(get(settings)),
            Accessor::Float { get, .. } => SettingValue::Float(get(settings)),
            Accessor::Double { get, .. } => SettingValue::Double(get(settings)),
            Accessor::Text { get, .. } => SettingValue::Text(get(settings)),
            Accessor::Boolean { get, .. } => SettingValue::Boolean(get(settings)),
        }
    }
}

macro_rules! field {
    ($name:ident, Integer) => {
        FieldDescriptor {
            name: stringify!($name),
            accessor: Accessor::Integer {
                get: |s| s.$name,
                set: |s, v| s.$name = v,
            },
        }
    };
    ($name:ident, Float) => {
        FieldDescriptor {
            name: stringify!($name),
            accessor: Accessor::Float {
                get: |s| s.$name,
                set: |s, v| s.$name = v,
            },
        }
    };
    ($name:ident, Double) => {
        FieldDescriptor {
            name: stringify!($name),
            accessor: Accessor::Double {
                get: |s| s.$name,
                set: |s, v| s.$name = v,
            },
        }
    };
    ($name:ident, Text) => {
        FieldDescriptor {
            name: stringify!($name),
            accessor: Accessor::Text {
                get: |s| s.$name.clone(),
                set: |s, v| s.$name = v,
            },
        }
    };
    ($name:ident, Boolean) => {
        FieldDescriptor {
            name: stringify!($name),
            accessor: Accessor::Boolean {
                get: |s| s.$name,
                set: |s, v| s.$name = v,
            },
        }
    };
}

/// Every settings field that can be set by name.
pub static FIELDS: &[FieldDescriptor] = &[
    field!(fade_transition_time, Double),
    field!(slideshow_transition_time, Integer),
    field!(info_bar_font_size, Integer),
    field!(date_time_font_family, Text),
    field!(date_time_format, Text),
    field!(rotation, Integer),
    field!(shuffle, Boolean),
    field!(image_stretch, Text),
    field!(video_stretch, Text),
    field!(video_volume, Float),
    field!(show_info_date_time, Boolean),
    field!(is_sync_enabled, Boolean),
];

/// Finds the descriptor for `name`, if the field exists.
pub fn lookup(name: &str) -> Option<&'static FieldDescriptor> {
    FIELDS.iter().find(|f| f.name == name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
