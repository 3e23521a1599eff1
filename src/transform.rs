use std::collections::BTreeMap;

/// The plain `name -> value` form a transform is persisted as.
pub type TransformParams = BTreeMap<String, f64>;

/// Edit parameters applied when deriving the edited tier from the
/// original.
///
/// Every adjustment is neutral at `0.0`. Keys this type does not know
/// about are carried through untouched so spreading a transform back
/// into its parameters never loses anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterTransform {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub warmth: f64,
    pub sharpen: f64,
    pub vignette: f64,

    /// Parameters without a named field, kept as-is.
    pub extra: TransformParams,
}

impl FilterTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a transform from its stored parameters.
    pub fn from_params(params: &TransformParams) -> Self {
        let mut transform = Self::default();

        for (name, value) in params {
            match transform.field_mut(name) {
                Some(field) => *field = *value,
                None => {
                    transform.extra.insert(name.clone(), *value);
                },
            }
        }

        transform
    }

    /// Spreads the transform into its plain parameter form.
    pub fn to_params(&self) -> TransformParams {
        let mut params = self.extra.clone();
        params.extend(
            self.named()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value)),
        );
        params
    }

    /// True if no adjustment would change the image.
    pub fn is_identity(&self) -> bool {
        self.named().iter().all(|(_, value)| *value == 0.0)
            && self.extra.values().all(|value| *value == 0.0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn named(&self) -> [(&'static str, f64); 6] {
        [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
            ("warmth", self.warmth),
            ("sharpen", self.sharpen),
            ("vignette", self.vignette),
        ]
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        let field = match name {
            "brightness" => &mut self.brightness,
            "contrast" => &mut self.contrast,
            "saturation" => &mut self.saturation,
            "warmth" => &mut self.warmth,
            "sharpen" => &mut self.sharpen,
            "vignette" => &mut self.vignette,
            _ => return None,
        };

        Some(field)
    }
}

impl From<&TransformParams> for FilterTransform {
    fn from(params: &TransformParams) -> Self {
        Self::from_params(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        let transform = FilterTransform::default();
        assert!(transform.is_identity());
    }

    #[test]
    fn test_params_rebuild_named_and_unknown_keys() {
        let params: TransformParams = [
            ("contrast".to_string(), 0.25),
            ("grain".to_string(), 3.0),
        ]
        .into_iter()
        .collect();

        let transform = FilterTransform::from_params(&params);
        assert_eq!(transform.contrast, 0.25);
        assert_eq!(transform.extra.get("grain"), Some(&3.0));
        assert!(!transform.is_identity());

        let spread = transform.to_params();
        assert_eq!(spread.get("contrast"), Some(&0.25));
        assert_eq!(spread.get("grain"), Some(&3.0));
        assert_eq!(spread.get("brightness"), Some(&0.0));
        assert_eq!(FilterTransform::from_params(&spread), transform);
    }

    #[test]
    fn test_reset() {
        let mut transform = FilterTransform::new();
        transform.warmth = -0.4;
        transform.extra.insert("grain".to_string(), 1.0);
        assert!(!transform.is_identity());

        transform.reset();
        assert!(transform.is_identity());
        assert!(transform.extra.is_empty());
    }
}
