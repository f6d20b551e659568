use crate::error::{Error, Result};
use crate::types::{Rect, SheetTemplate};

/// Sheet templates keyed by material id, kept in supply order.
///
/// A material may carry several standard sizes; lookups return them in the
/// order they were added.
#[derive(Debug, Clone, Default)]
pub struct MaterialCatalog {
    templates: Vec<SheetTemplate>,
}

impl MaterialCatalog {
    pub fn new(templates: Vec<SheetTemplate>) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &[SheetTemplate] {
        &self.templates
    }

    pub fn contains(&self, material: &str) -> bool {
        self.templates.iter().any(|t| t.material == material)
    }

    pub fn templates_for(&self, material: &str) -> Result<Vec<&SheetTemplate>> {
        let found: Vec<&SheetTemplate> = self
            .templates
            .iter()
            .filter(|t| t.material == material)
            .collect();
        if found.is_empty() {
            return Err(Error::MaterialNotFound(material.to_string()));
        }
        Ok(found)
    }

    /// First template of `material` able to hold `piece` in an allowed
    /// orientation. `Ok(None)` means the piece is too large for every size.
    pub fn sheet_for(
        &self,
        material: &str,
        piece: Rect,
        allow_rotate: bool,
    ) -> Result<Option<&SheetTemplate>> {
        Ok(self
            .templates_for(material)?
            .into_iter()
            .find(|t| piece.fits_in_any(&t.rect(), allow_rotate)))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for t in &self.templates {
            if t.rect().is_degenerate() {
                return Err(Error::InvalidDimension {
                    subject: format!("sheet '{}'", t.id),
                    rect: t.rect(),
                });
            }
            if !t.unit_cost.is_finite() || t.unit_cost < 0.0 {
                return Err(Error::InvalidCost {
                    sheet: t.id.clone(),
                    cost: t.unit_cost,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MaterialCatalog {
        MaterialCatalog::new(vec![
            SheetTemplate::new("ply-small", "ply15", 1220, 610, 20.0),
            SheetTemplate::new("mdf", "mdf18", 2440, 1220, 35.0),
            SheetTemplate::new("ply-large", "ply15", 2750, 1830, 60.0),
        ])
    }

    #[test]
    fn test_unknown_material() {
        let err = catalog().templates_for("oak").unwrap_err();
        assert!(matches!(err, Error::MaterialNotFound(m) if m == "oak"));
    }

    #[test]
    fn test_templates_in_supply_order() {
        let cat = catalog();
        let ids: Vec<&str> = cat
            .templates_for("ply15")
            .unwrap()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["ply-small", "ply-large"]);
    }

    #[test]
    fn test_sheet_for_picks_first_that_holds_piece() {
        let cat = catalog();
        let small = cat.sheet_for("ply15", Rect::new(1000, 500), true).unwrap();
        assert_eq!(small.unwrap().id, "ply-small");

        let large = cat.sheet_for("ply15", Rect::new(2000, 800), true).unwrap();
        assert_eq!(large.unwrap().id, "ply-large");

        // Only fits the small sheet turned, which grain lock forbids.
        let locked = cat.sheet_for("ply15", Rect::new(600, 1200), false).unwrap();
        assert_eq!(locked.unwrap().id, "ply-large");

        assert!(cat.sheet_for("ply15", Rect::new(3000, 100), true).unwrap().is_none());
    }

    #[test]
    fn test_validate_rejects_bad_templates() {
        let zero = MaterialCatalog::new(vec![SheetTemplate::new("z", "m", 0, 100, 1.0)]);
        assert!(matches!(zero.validate(), Err(Error::InvalidDimension { .. })));

        let negative = MaterialCatalog::new(vec![SheetTemplate::new("n", "m", 100, 100, -1.0)]);
        assert!(matches!(negative.validate(), Err(Error::InvalidCost { .. })));
    }
}
