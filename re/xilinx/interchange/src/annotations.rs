//! Extra-mode annotation records: tags, routed tags and cell constraints.
//!
//! Annotations are read from a TOML file of tagged records:
//!
//! ```toml
//! [[annotation]]
//! kind = "tag"
//! name = "FFSYNC"
//! description = "flip-flop reset type"
//! site_types = ["SLICEL", "SLICEM"]
//! states = ["SYNC", "ASYNC"]
//! default = "ASYNC"
//!
//! [[annotation]]
//! kind = "routed_tag"
//! name = "AFFMUX"
//! site_types = ["SLICEL"]
//! routing_bel = "AFFMUX"
//! pins = [
//!     { bel = "AFFMUX", pin = "AX", tag = "AX" },
//!     { bel = "AFFMUX", pin = "O6", tag = "O6" },
//! ]
//!
//! [[annotation]]
//! kind = "cell_constraint"
//! cell = "FDRE"
//! site_type = "SLICEL"
//! bel = "AFF"
//! port = "D"
//! routed_tag = "AFFMUX"
//! state = "AX"
//! ```
//!
//! The raw [`Annotations`] must be checked against a [`Device`] before use;
//! only [`CheckedAnnotations`] are accepted by the report writer.

use crate::db::{Device, SiteType};
use crate::error::Error;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub site_types: Vec<String>,
    pub states: Vec<String>,
    pub default: String,
}

/// One input of a routed tag's mux.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct RoutedPin {
    pub bel: String,
    pub pin: String,
    /// State label selecting this input.  It names a state of the routed
    /// tag itself, not a [`Tag`]; the labels of one routed tag must be
    /// non-empty and distinct.
    pub tag: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct RoutedTag {
    pub name: String,
    pub site_types: Vec<String>,
    pub routing_bel: String,
    pub pins: Vec<RoutedPin>,
}

impl RoutedTag {
    /// The states of a routed tag are the labels bound to its pins.
    pub fn has_state(&self, state: &str) -> bool {
        self.pins.iter().any(|p| p.tag == state)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct CellConstraint {
    pub cell: String,
    pub site_type: String,
    pub bel: String,
    pub port: String,
    pub routed_tag: String,
    pub state: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    Tag(Tag),
    RoutedTag(RoutedTag),
    CellConstraint(CellConstraint),
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize)]
pub struct Annotations {
    #[serde(default, rename = "annotation")]
    pub annotations: Vec<Annotation>,
}

/// Annotations whose every reference resolves in a given device.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CheckedAnnotations {
    tags: Vec<Tag>,
    routed_tags: Vec<RoutedTag>,
    cell_constraints: Vec<CellConstraint>,
}

impl CheckedAnnotations {
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn routed_tags(&self) -> &[RoutedTag] {
        &self.routed_tags
    }

    pub fn cell_constraints(&self) -> &[CellConstraint] {
        &self.cell_constraints
    }
}

fn dangling(context: &str, what: &'static str, name: &str) -> Error {
    Error::DanglingReference {
        context: context.to_string(),
        what,
        name: name.to_string(),
    }
}

fn invalid(context: &str, reason: String) -> Error {
    Error::InvalidAnnotation {
        context: context.to_string(),
        reason,
    }
}

fn lookup_site_type<'a>(device: &'a Device, context: &str, name: &str) -> Result<&'a SiteType, Error> {
    match device.site_type(name) {
        Some(id) => Ok(&device.site_types[id]),
        None => Err(dangling(context, "site type", name)),
    }
}

fn check_bel_pin(st: &SiteType, context: &str, bel: &str, pin: &str) -> Result<(), Error> {
    let Some(bid) = st.bel(bel) else {
        return Err(dangling(context, "bel", &format!("{}.{bel}", st.name)));
    };
    if st.bel_pin(bid, pin).is_none() {
        return Err(dangling(context, "bel pin", &format!("{}.{bel}.{pin}", st.name)));
    }
    Ok(())
}

impl Annotations {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&s).map_err(|source| Error::AnnotationSyntax {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves every site type, bel, pin and tag cited by the annotations.
    ///
    /// Records keep their file order within each kind.
    pub fn validate(&self, device: &Device) -> Result<CheckedAnnotations, Error> {
        let mut res = CheckedAnnotations::default();
        for ann in &self.annotations {
            match ann {
                Annotation::Tag(tag) => res.tags.push(tag.clone()),
                Annotation::RoutedTag(rt) => res.routed_tags.push(rt.clone()),
                Annotation::CellConstraint(cc) => res.cell_constraints.push(cc.clone()),
            }
        }

        let mut tag_names = HashSet::new();
        for tag in &res.tags {
            let context = format!("tag {}", tag.name);
            if !tag_names.insert(tag.name.as_str()) {
                return Err(invalid(&context, "duplicate tag".to_string()));
            }
            if tag.site_types.is_empty() {
                return Err(invalid(&context, "no site types".to_string()));
            }
            for st in &tag.site_types {
                lookup_site_type(device, &context, st)?;
            }
            if tag.states.is_empty() {
                return Err(invalid(&context, "no states".to_string()));
            }
            let mut states = HashSet::new();
            for state in &tag.states {
                if !states.insert(state.as_str()) {
                    return Err(invalid(&context, format!("duplicate state {state}")));
                }
            }
            if !states.contains(tag.default.as_str()) {
                return Err(invalid(
                    &context,
                    format!("default {} is not a state", tag.default),
                ));
            }
        }

        let mut routed_tags = HashMap::new();
        for rt in &res.routed_tags {
            let context = format!("routed tag {}", rt.name);
            if routed_tags.insert(rt.name.as_str(), rt).is_some() {
                return Err(invalid(&context, "duplicate routed tag".to_string()));
            }
            if rt.site_types.is_empty() {
                return Err(invalid(&context, "no site types".to_string()));
            }
            let mut labels = HashSet::new();
            for pin in &rt.pins {
                if pin.tag.is_empty() {
                    return Err(invalid(
                        &context,
                        format!("pin {}.{} has no state label", pin.bel, pin.pin),
                    ));
                }
                if !labels.insert(pin.tag.as_str()) {
                    return Err(invalid(&context, format!("duplicate state {}", pin.tag)));
                }
            }
            for st in &rt.site_types {
                let st = lookup_site_type(device, &context, st)?;
                if st.bel(&rt.routing_bel).is_none() {
                    return Err(dangling(
                        &context,
                        "bel",
                        &format!("{}.{}", st.name, rt.routing_bel),
                    ));
                }
                for pin in &rt.pins {
                    check_bel_pin(st, &context, &pin.bel, &pin.pin)?;
                }
            }
        }

        for cc in &res.cell_constraints {
            let context = format!("cell constraint {}.{}", cc.cell, cc.port);
            let st = lookup_site_type(device, &context, &cc.site_type)?;
            if st.bel(&cc.bel).is_none() {
                return Err(dangling(&context, "bel", &format!("{}.{}", st.name, cc.bel)));
            }
            let Some(rt) = routed_tags.get(cc.routed_tag.as_str()) else {
                return Err(dangling(&context, "routed tag", &cc.routed_tag));
            };
            if !rt.site_types.contains(&cc.site_type) {
                return Err(invalid(
                    &context,
                    format!(
                        "routed tag {} does not apply to site type {}",
                        rt.name, cc.site_type
                    ),
                ));
            }
            if !rt.has_state(&cc.state) {
                return Err(invalid(
                    &context,
                    format!("{} is not a state of routed tag {}", cc.state, rt.name),
                ));
            }
        }

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{DeviceBuilder, SiteTypeBuilder};
    use crate::db::{BelCategory, PinDir};
    use assert_matches::assert_matches;

    fn device() -> Device {
        let mut b = DeviceBuilder::new("xc7tiny");
        let mut st = SiteTypeBuilder::new("SLICEL");
        let ax = st.site_pin("AX", PinDir::Input);
        let mux = st.bel("AFFMUX", BelCategory::Routing);
        let mux_ax = st.bel_pin(mux, "AX", PinDir::Input);
        let mux_o6 = st.bel_pin(mux, "O6", PinDir::Input);
        let mux_out = st.bel_pin(mux, "OUT", PinDir::Output);
        let ff = st.bel("AFF", BelCategory::Logic);
        let ff_d = st.bel_pin(ff, "D", PinDir::Input);
        st.site_wire("AX", &[ax, mux_ax]);
        st.site_wire("A_O6", &[mux_o6]);
        st.site_wire("AFFMUX_OUT", &[mux_out, ff_d]);
        b.add_site_type(st);
        b.finish()
    }

    const GOOD: &str = r#"
[[annotation]]
kind = "tag"
name = "FFSYNC"
description = "flip-flop reset type"
site_types = ["SLICEL"]
states = ["SYNC", "ASYNC"]
default = "ASYNC"

[[annotation]]
kind = "routed_tag"
name = "AFFMUX"
site_types = ["SLICEL"]
routing_bel = "AFFMUX"
pins = [
    { bel = "AFFMUX", pin = "AX", tag = "AX" },
    { bel = "AFFMUX", pin = "O6", tag = "O6" },
]

[[annotation]]
kind = "cell_constraint"
cell = "FDRE"
site_type = "SLICEL"
bel = "AFF"
port = "D"
routed_tag = "AFFMUX"
state = "AX"
"#;

    #[test]
    fn parse_and_validate() {
        let ann = Annotations::from_toml(GOOD).unwrap();
        assert_eq!(ann.annotations.len(), 3);
        assert_matches!(&ann.annotations[0], Annotation::Tag(t) if t.default == "ASYNC");
        let checked = ann.validate(&device()).unwrap();
        assert_eq!(checked.tags().len(), 1);
        assert_eq!(checked.routed_tags()[0].pins.len(), 2);
        assert_eq!(checked.cell_constraints()[0].state, "AX");
    }

    #[test]
    fn empty_file() {
        let ann = Annotations::from_toml("").unwrap();
        let checked = ann.validate(&device()).unwrap();
        assert!(checked.tags().is_empty());
    }

    #[test]
    fn unknown_kind() {
        assert!(Annotations::from_toml("[[annotation]]\nkind = \"bogus\"\n").is_err());
    }

    #[test]
    fn dangling_site_type() {
        let ann = Annotations::from_toml(&GOOD.replace(
            "site_types = [\"SLICEL\"]\nstates",
            "site_types = [\"SLICEX\"]\nstates",
        ))
        .unwrap();
        assert_matches!(
            ann.validate(&device()),
            Err(Error::DanglingReference { what: "site type", name, .. }) if name == "SLICEX"
        );
    }

    #[test]
    fn dangling_bel_pin() {
        let ann =
            Annotations::from_toml(&GOOD.replace("pin = \"O6\"", "pin = \"O5\"")).unwrap();
        assert_matches!(
            ann.validate(&device()),
            Err(Error::DanglingReference { what: "bel pin", name, .. }) if name == "SLICEL.AFFMUX.O5"
        );
    }

    #[test]
    fn dangling_routing_bel() {
        let ann = Annotations::from_toml(
            &GOOD.replace("routing_bel = \"AFFMUX\"", "routing_bel = \"BFFMUX\""),
        )
        .unwrap();
        assert_matches!(
            ann.validate(&device()),
            Err(Error::DanglingReference { what: "bel", .. })
        );
    }

    #[test]
    fn dangling_routed_tag() {
        let ann = Annotations::from_toml(
            &GOOD.replace("routed_tag = \"AFFMUX\"", "routed_tag = \"BFFMUX\""),
        )
        .unwrap();
        assert_matches!(
            ann.validate(&device()),
            Err(Error::DanglingReference { what: "routed tag", .. })
        );
    }

    #[test]
    fn bad_states() {
        let ann = Annotations::from_toml(&GOOD.replace("default = \"ASYNC\"", "default = \"X\""))
            .unwrap();
        assert_matches!(
            ann.validate(&device()),
            Err(Error::InvalidAnnotation { .. })
        );
        let ann = Annotations::from_toml(&GOOD.replace("state = \"AX\"", "state = \"O5\"")).unwrap();
        assert_matches!(
            ann.validate(&device()),
            Err(Error::InvalidAnnotation { context, .. }) if context == "cell constraint FDRE.D"
        );
    }

    #[test]
    fn tag_without_site_types() {
        let ann = Annotations::from_toml(&GOOD.replace(
            "site_types = [\"SLICEL\"]\nstates",
            "site_types = []\nstates",
        ))
        .unwrap();
        assert_matches!(
            ann.validate(&device()),
            Err(Error::InvalidAnnotation { context, reason })
                if context == "tag FFSYNC" && reason == "no site types"
        );
    }

    #[test]
    fn routed_pin_labels() {
        // Labels need not name a declared tag.
        let ann = Annotations::from_toml(&GOOD.replace("tag = \"O6\"", "tag = \"LUT\"")).unwrap();
        let checked = ann.validate(&device()).unwrap();
        assert!(checked.routed_tags()[0].has_state("LUT"));
        assert!(checked.tags().iter().all(|t| t.name != "LUT"));

        let ann = Annotations::from_toml(&GOOD.replace("tag = \"O6\"", "tag = \"AX\"")).unwrap();
        assert_matches!(
            ann.validate(&device()),
            Err(Error::InvalidAnnotation { context, reason })
                if context == "routed tag AFFMUX" && reason == "duplicate state AX"
        );
        let ann = Annotations::from_toml(&GOOD.replace("tag = \"O6\"", "tag = \"\"")).unwrap();
        assert_matches!(
            ann.validate(&device()),
            Err(Error::InvalidAnnotation { context, .. }) if context == "routed tag AFFMUX"
        );
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            Annotations::from_file(dir.path().join("nope.toml")),
            Err(Error::Io { .. })
        );
    }
}
