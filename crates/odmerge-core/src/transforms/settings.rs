/*
 * transforms/settings.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Update-on-load settings in settings.xml.
 */

use crate::context::Context;
use crate::document::Part;
use crate::schema::Ns;
use crate::transform::Transform;
use crate::{EngineError, Result};
use odmerge_xml::Element;

/// Asks the office suite to update links, fields and charts when the
/// document is loaded, so substituted field values are displayed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Autoupdate;

impl Transform for Autoupdate {
    fn name(&self) -> &str {
        "autoupdate"
    }

    fn part(&self) -> Part {
        Part::Settings
    }

    fn priority(&self) -> i32 {
        20
    }

    fn apply(&mut self, root: &mut Element, ctx: &mut Context) -> Result<()> {
        let schema = ctx.schema();
        let name_attr = schema.tag(Ns::Config, "name");
        let item_set_tag = schema.tag(Ns::Config, "config-item-set");
        let item_tag = schema.tag(Ns::Config, "config-item");

        let settings = root
            .find_mut(&schema.tag(Ns::Office, "settings"))
            .ok_or_else(|| EngineError::schema_in("settings.xml", "missing <office:settings>"))?;
        let config = settings
            .children
            .iter_mut()
            .find(|e| e.tag == item_set_tag && e.get(&name_attr) == Some("configuration-settings"))
            .ok_or_else(|| {
                EngineError::schema_in("settings.xml", "missing configuration-settings item set")
            })?;

        for node in config.children.iter_mut().filter(|e| e.tag == item_tag) {
            match node.get(&name_attr) {
                Some("LinkUpdateMode") => node.set_text("2"),
                Some("FieldAutoUpdate" | "ChartAutoUpdate") => node.set_text("true"),
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Generation, SchemaConfig};
    use odmerge_xml::parse;

    #[test]
    fn test_autoupdate_sets_items() {
        let mut ctx = Context::new(SchemaConfig::new(Generation::OpenOffice1));
        let mut root = parse(
            r#"<office:document-settings xmlns:office="http://openoffice.org/2000/office" xmlns:config="http://openoffice.org/2001/config"><office:settings>
  <config:config-item-set config:name="view-settings"><config:config-item config:name="LinkUpdateMode">0</config:config-item></config:config-item-set>
  <config:config-item-set config:name="configuration-settings">
    <config:config-item config:name="LinkUpdateMode">1</config:config-item>
    <config:config-item config:name="FieldAutoUpdate">false</config:config-item>
    <config:config-item config:name="ChartAutoUpdate">false</config:config-item>
    <config:config-item config:name="PrintTables">false</config:config-item>
  </config:config-item-set>
</office:settings></office:document-settings>"#,
        )
        .unwrap();

        Autoupdate.apply(&mut root, &mut ctx).unwrap();

        let settings = &root.children[0];
        let view = &settings.children[0];
        assert_eq!(view.children[0].text.as_deref(), Some("0"));
        let values: Vec<_> = settings.children[1]
            .children
            .iter()
            .map(|e| e.text.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(values, vec!["2", "true", "true", "false"]);
    }
}
