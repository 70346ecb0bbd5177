use std::path::Path;

use minijinja::{path_loader, context, AutoEscape, Environment};
use minijinja::value::Value;
use serde::Serialize;

use crate::error::Result;
use crate::manifest::Manifest;
use crate::templating::{Engine, EngineInit};

#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl EngineInit for MiniJinjaEngine {
    type Engine = Self;

    fn init<G: Serialize>(template_dir: &Path, globals: G) -> Self::Engine {
        let mut env = Environment::new();
        env.set_loader(path_loader(template_dir));
        // References are emitted verbatim; HTML escaping would mangle `/`.
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_global("G", Value::from_serializable(&globals));
        env.add_function("now", ext::now);
        env.add_filter("date", ext::date);
        MiniJinjaEngine { env }
    }
}

impl Engine for MiniJinjaEngine {
    fn render(&self, name: &str, manifest: &Manifest) -> Result<String> {
        let template = self.env.get_template(name)?;
        let html = template.render(context! {
            scripts => &manifest.scripts,
            styles => &manifest.styles,
        })?;

        Ok(html)
    }
}

mod ext {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use minijinja::{value::Value, Error, ErrorKind};

    pub fn date(value: Value, fmt: &str) -> Result<Value, Error> {
        if let Ok(ts) = i64::try_from(value.clone()) {
            let datetime = DateTime::<Utc>::from_timestamp(ts, 0)
                .ok_or_else(|| Error::new(
                    ErrorKind::InvalidOperation,
                    "invalid timestamp provided to `date`"
                ))?;

            return Ok(datetime.format(fmt).to_string().into());
        }

        let kind = value.kind();
        let string = value.as_str()
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("`date` must be applied to a string or integer, found {kind}")
            ))?;

        let datetime = string.parse::<NaiveDate>().map(|d| d.format(fmt))
            .or_else(|_| string.parse::<NaiveDateTime>().map(|dt| dt.format(fmt)))
            .or_else(|_| string.parse::<DateTime<Utc>>().map(|dt| dt.format(fmt)))
            .map_err(|e| Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to parse {string}: {e}")
            ))?;

        Ok(datetime.to_string().into())
    }

    pub fn now() -> i64 {
        Utc::now().timestamp()
    }
}
