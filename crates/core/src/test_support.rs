//! In-crate fixture entity for unit tests.

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::entity::{CustomDeserializer, CustomSerializer, EntitySpec, Permissions, Serializable};
use crate::error::CoreError;
use crate::field::FieldDef;
use crate::roles::Requester;
use crate::types::{DbId, Timestamp};

pub fn ts(s: &str) -> Timestamp {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

#[derive(Debug, Clone)]
pub struct Widget {
    pub id: Option<DbId>,
    pub active: bool,
    pub name: String,
    pub serial: Option<String>,
    pub label: Option<String>,
    pub count: i64,
    pub price: Option<f64>,
    pub enabled: bool,
    pub updated_at: Option<Timestamp>,
    pub secret: Option<String>,
}

impl Default for Widget {
    fn default() -> Self {
        Self {
            id: None,
            active: true,
            name: String::new(),
            serial: None,
            label: None,
            count: 0,
            price: None,
            enabled: false,
            updated_at: None,
            secret: None,
        }
    }
}

impl Widget {
    pub fn sample() -> Self {
        Self {
            id: Some(7),
            name: "gizmo".into(),
            serial: Some("SN-1".into()),
            label: Some("green".into()),
            count: 3,
            price: Some(9.5),
            enabled: true,
            updated_at: Some(ts("2024-03-01 10:00:00")),
            secret: Some("hunter2".into()),
            ..Self::default()
        }
    }
}

fn display(w: &Widget, requester: Option<&dyn Requester>) -> Value {
    match (&w.serial, requester.is_some_and(|r| r.is_administrator())) {
        (Some(serial), true) => Value::String(format!("{} ({serial})", w.name)),
        _ => Value::String(w.name.clone()),
    }
}

fn nickname(w: &mut Widget, raw: &Value) -> Result<bool, CoreError> {
    let nick = raw
        .as_str()
        .ok_or_else(|| CoreError::Validation("nickname must be a string".into()))?
        .to_uppercase();
    let changed = w.label.as_deref() != Some(nick.as_str());
    w.label = Some(nick);
    Ok(changed)
}

pub static WIDGET_FIELDS: &[FieldDef<Widget>] = &[
    crate::field!(Widget, id: Integer),
    crate::field!(Widget, active: Boolean),
    crate::field!(Widget, name: Text),
    crate::field!(Widget, serial: Text),
    crate::field!(Widget, label: Text),
    crate::field!(Widget, count: Integer),
    crate::field!(Widget, price: Float),
    crate::field!(Widget, enabled: Boolean),
    crate::field!(Widget, updated_at: DateTime),
    crate::field!(Widget, secret: Text),
];

static WIDGET_SPEC: EntitySpec<Widget> = EntitySpec {
    entity: "widget",
    table: "widgets",
    fields: WIDGET_FIELDS,
    mandatory: &["name"],
    writable_once: &["serial"],
    writable: &["name", "label", "count", "enabled", "updated_at"],
    standard_readable: &["name", "label", "display"],
    admin_readable: &[
        "name",
        "serial",
        "label",
        "count",
        "price",
        "enabled",
        "updated_at",
        "secret",
        "display",
        "active",
    ],
    permissions: Permissions {
        standard_can_read_many: true,
        ..Permissions::DEFAULT
    },
    serializers: &[CustomSerializer {
        name: "display",
        func: display,
    }],
    deserializers: &[CustomDeserializer {
        name: "nickname",
        func: nickname,
    }],
};

impl Serializable for Widget {
    fn spec() -> &'static EntitySpec<Self> {
        &WIDGET_SPEC
    }

    fn id(&self) -> Option<DbId> {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
