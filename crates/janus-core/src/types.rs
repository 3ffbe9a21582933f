use serde::{Deserialize, Serialize};

/// Subject identifier from the `Template_ID` column. Not unique across rows.
pub type TemplateId = i64;

/// Per-image attribute kinds recognized in metadata headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Frame,
    RightEyeX,
    RightEyeY,
    LeftEyeX,
    LeftEyeY,
    NoseBaseX,
    NoseBaseY,
    /// Header name with no known attribute kind.
    Invalid,
}

impl Attribute {
    /// Map a metadata column header to its attribute kind.
    pub fn from_column(name: &str) -> Self {
        match name {
            "Frame" => Self::Frame,
            "Right_Eye_X" => Self::RightEyeX,
            "Right_Eye_Y" => Self::RightEyeY,
            "Left_Eye_X" => Self::LeftEyeX,
            "Left_Eye_Y" => Self::LeftEyeY,
            "Nose_Base_X" => Self::NoseBaseX,
            "Nose_Base_Y" => Self::NoseBaseY,
            _ => Self::Invalid,
        }
    }
}

/// Attribute values attached to one image, with missing entries dropped.
///
/// Kinds and values are kept in lockstep: `attributes().len() == values().len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeList {
    attributes: Vec<Attribute>,
    values: Vec<f32>,
}

impl AttributeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attribute: Attribute, value: f32) {
        self.attributes.push(attribute);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, f32)> + '_ {
        self.attributes
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_from_column_known_names() {
        assert_eq!(Attribute::from_column("Frame"), Attribute::Frame);
        assert_eq!(Attribute::from_column("Left_Eye_Y"), Attribute::LeftEyeY);
        assert_eq!(Attribute::from_column("Nose_Base_X"), Attribute::NoseBaseX);
    }

    #[test]
    fn test_attribute_from_column_unknown_is_invalid() {
        assert_eq!(Attribute::from_column("Yaw"), Attribute::Invalid);
        assert_eq!(Attribute::from_column("frame"), Attribute::Invalid);
    }

    #[test]
    fn test_push_keeps_kinds_and_values_in_lockstep() {
        let mut list = AttributeList::new();
        assert!(list.is_empty());
        list.push(Attribute::Frame, 3.0);
        list.push(Attribute::RightEyeY, 0.0);
        assert_eq!(list.len(), 2);
        assert_eq!(list.attributes(), &[Attribute::Frame, Attribute::RightEyeY]);
        assert_eq!(list.values(), &[3.0, 0.0]);
        assert_eq!(
            list.iter().collect::<Vec<_>>(),
            vec![(Attribute::Frame, 3.0), (Attribute::RightEyeY, 0.0)]
        );
    }
}
