use serde::{Deserialize, Serialize};
use std::fmt;

/// Class label reported by the anomaly model, or chosen by the user for a
/// new contour. Unknown classes are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClassLabel {
    PointOverloadRed,
    PointOverloadYellow,
    LooseJointRed,
    LooseJointYellow,
    FullOverloadRed,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Potential,
}

/// An entry of the class picker shown when confirming a new contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassDefinition {
    pub name: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

/// Classes offered for user-drawn contours, in picker order.
pub const SELECTABLE_CLASSES: [ClassDefinition; 5] = [
    ClassDefinition {
        name: "point_overload_yellow",
        label: "Point Overload (Potential)",
        color: "#facc15",
    },
    ClassDefinition {
        name: "point_overload_red",
        label: "Point Overload (Critical)",
        color: "#f87171",
    },
    ClassDefinition {
        name: "loose_joint_yellow",
        label: "Loose Joint (Potential)",
        color: "#facc15",
    },
    ClassDefinition {
        name: "loose_joint_red",
        label: "Loose Joint (Critical)",
        color: "#f87171",
    },
    ClassDefinition {
        name: "full_overload_red",
        label: "Full Wire Overload",
        color: "#f87171",
    },
];

impl ClassLabel {
    /// Class preselected in the new-contour dialog.
    pub fn default_for_new_contour() -> Self {
        ClassLabel::PointOverloadYellow
    }

    pub fn as_str(&self) -> &str {
        match self {
            ClassLabel::PointOverloadRed => "point_overload_red",
            ClassLabel::PointOverloadYellow => "point_overload_yellow",
            ClassLabel::LooseJointRed => "loose_joint_red",
            ClassLabel::LooseJointYellow => "loose_joint_yellow",
            ClassLabel::FullOverloadRed => "full_overload_red",
            ClassLabel::Other(raw) => raw,
        }
    }

    /// Human readable description; unknown classes show their raw name.
    pub fn display_name(&self) -> &str {
        match self {
            ClassLabel::PointOverloadRed => "Point Overload Faulty",
            ClassLabel::PointOverloadYellow => "Point Overload Potential Faulty",
            ClassLabel::LooseJointRed => "Loose Joint Faulty",
            ClassLabel::LooseJointYellow => "Loose Joint Potential Faulty",
            ClassLabel::FullOverloadRed => "Full Overload Faulty",
            ClassLabel::Other(raw) => raw,
        }
    }

    pub fn severity(&self) -> Severity {
        if self.as_str().contains("_red") {
            Severity::Critical
        } else {
            Severity::Potential
        }
    }

    pub fn is_normal(&self) -> bool {
        self.as_str().to_lowercase().contains("normal")
    }
}

impl From<&str> for ClassLabel {
    fn from(raw: &str) -> Self {
        match raw {
            "point_overload_red" => ClassLabel::PointOverloadRed,
            "point_overload_yellow" => ClassLabel::PointOverloadYellow,
            "loose_joint_red" => ClassLabel::LooseJointRed,
            "loose_joint_yellow" => ClassLabel::LooseJointYellow,
            "full_overload_red" => ClassLabel::FullOverloadRed,
            other => ClassLabel::Other(other.to_string()),
        }
    }
}

impl From<String> for ClassLabel {
    fn from(raw: String) -> Self {
        ClassLabel::from(raw.as_str())
    }
}

impl From<ClassLabel> for String {
    fn from(label: ClassLabel) -> Self {
        match label {
            ClassLabel::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl Default for ClassLabel {
    fn default() -> Self {
        ClassLabel::Other(String::new())
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look up a picker entry by raw class name.
pub fn find_class(name: &str) -> Option<&'static ClassDefinition> {
    SELECTABLE_CLASSES.iter().find(|c| c.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_red_suffix() {
        assert_eq!(ClassLabel::LooseJointRed.severity(), Severity::Critical);
        assert_eq!(ClassLabel::PointOverloadYellow.severity(), Severity::Potential);
        assert_eq!(ClassLabel::from("custom_red_hotspot").severity(), Severity::Critical);
    }

    #[test]
    fn unknown_classes_round_trip_verbatim() {
        let label: ClassLabel = serde_json::from_str("\"Normal_Transformer\"").unwrap();
        assert_eq!(label, ClassLabel::Other("Normal_Transformer".into()));
        assert!(label.is_normal());
        assert_eq!(label.display_name(), "Normal_Transformer");
        assert_eq!(serde_json::to_string(&label).unwrap(), "\"Normal_Transformer\"");
    }

    #[test]
    fn known_classes_use_wire_names() {
        let label: ClassLabel = serde_json::from_str("\"full_overload_red\"").unwrap();
        assert_eq!(label, ClassLabel::FullOverloadRed);
        assert_eq!(label.display_name(), "Full Overload Faulty");
        assert_eq!(serde_json::to_string(&label).unwrap(), "\"full_overload_red\"");
    }

    #[test]
    fn picker_contains_default_class() {
        let default = ClassLabel::default_for_new_contour();
        assert!(find_class(default.as_str()).is_some());
        assert!(SELECTABLE_CLASSES.iter().all(|c| ClassLabel::from(c.name) != ClassLabel::Other(c.name.into())));
    }
}
