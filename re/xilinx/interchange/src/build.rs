//! Name-based construction of [`Device`] databases.
//!
//! Misuse (duplicate or unknown names, mismatched pin counts) panics: the
//! builder is fed by loaders and tests, never by end-user input.

use crate::db::{
    Bel, BelCategory, BelId, BelPin, BelPinId, Device, Node, NodeId, NodeWire, PinDir, SitePin,
    SiteType, SiteTypeId, SiteWire, SiteWireId, Tile, TileId, TileType, TileTypeId, TtPip,
    TtSite, TtSiteId, TtWireId,
};
use std::collections::{HashMap, HashSet};
use unnamed_entity::EntityVec;

pub struct SiteTypeBuilder {
    st: SiteType,
}

impl SiteTypeBuilder {
    pub fn new(name: &str) -> Self {
        SiteTypeBuilder {
            st: SiteType {
                name: name.to_string(),
                pins: EntityVec::new(),
                bels: EntityVec::new(),
                bel_pins: EntityVec::new(),
                wires: EntityVec::new(),
                alt_site_types: vec![],
            },
        }
    }

    #[track_caller]
    pub fn bel(&mut self, name: &str, category: BelCategory) -> BelId {
        if self.st.bel(name).is_some() {
            panic!("duplicate bel {name} in site type {st}", st = self.st.name);
        }
        self.st.bels.push(Bel {
            name: name.to_string(),
            category,
            pins: vec![],
        })
    }

    #[track_caller]
    pub fn bel_pin(&mut self, bel: BelId, name: &str, dir: PinDir) -> BelPinId {
        if self.st.bel_pin(bel, name).is_some() {
            panic!(
                "duplicate pin {name} on bel {bel} in site type {st}",
                bel = self.st.bels[bel].name,
                st = self.st.name
            );
        }
        let bp = self.st.bel_pins.push(BelPin {
            name: name.to_string(),
            bel,
            dir,
            wire: None,
        });
        self.st.bels[bel].pins.push(bp);
        bp
    }

    /// Adds a site pin together with its port BEL; returns the port BEL pin.
    #[track_caller]
    pub fn site_pin(&mut self, name: &str, dir: PinDir) -> BelPinId {
        if self.st.pin(name).is_some() {
            panic!("duplicate site pin {name} in site type {st}", st = self.st.name);
        }
        let bel = self.bel(name, BelCategory::SitePort);
        let bel_dir = match dir {
            PinDir::Input => PinDir::Output,
            PinDir::Output => PinDir::Input,
            PinDir::Inout => PinDir::Inout,
        };
        let bel_pin = self.bel_pin(bel, name, bel_dir);
        self.st.pins.push(SitePin {
            name: name.to_string(),
            dir,
            bel_pin,
        });
        bel_pin
    }

    /// Attaches BEL pins to the named site wire, creating it if needed.
    #[track_caller]
    pub fn site_wire(&mut self, name: &str, pins: &[BelPinId]) -> SiteWireId {
        let existing = self
            .st
            .wires
            .iter()
            .find(|(_, w)| w.name == name)
            .map(|(id, _)| id);
        let wire = match existing {
            Some(id) => id,
            None => self.st.wires.push(SiteWire {
                name: name.to_string(),
                pins: vec![],
            }),
        };
        for &bp in pins {
            if let Some(other) = self.st.bel_pins[bp].wire {
                panic!(
                    "bel pin {pin} already on site wire {other}",
                    pin = self.st.bel_pins[bp].name,
                    other = self.st.wires[other].name
                );
            }
            self.st.bel_pins[bp].wire = Some(wire);
            self.st.wires[wire].pins.push(bp);
        }
        wire
    }

    pub fn finish(self) -> SiteType {
        self.st
    }
}

pub struct TileTypeBuilder {
    tt: TileType,
}

impl TileTypeBuilder {
    pub fn new(name: &str) -> Self {
        TileTypeBuilder {
            tt: TileType {
                name: name.to_string(),
                wires: EntityVec::new(),
                sites: EntityVec::new(),
                pips: vec![],
                wire_lookup: HashMap::new(),
            },
        }
    }

    pub fn wire(&mut self, name: &str) -> TtWireId {
        if let Some(w) = self.tt.wire(name) {
            return w;
        }
        let w = self.tt.wires.push(name.to_string());
        self.tt.wire_lookup.insert(name.to_string(), w);
        w
    }

    /// Adds a site slot; `pin_wires` lists the tile wire of every site pin, in site pin order.
    pub fn site(&mut self, site_type: SiteTypeId, pin_wires: &[&str]) -> TtSiteId {
        let mut wires = EntityVec::new();
        for w in pin_wires {
            wires.push(self.wire(w));
        }
        self.tt.sites.push(TtSite {
            site_type,
            pin_wires: wires,
        })
    }

    pub fn pip(&mut self, wire_from: &str, wire_to: &str, directional: bool, buffered: bool) {
        let wire_from = self.wire(wire_from);
        let wire_to = self.wire(wire_to);
        self.tt.pips.push(TtPip {
            wire_from,
            wire_to,
            directional,
            buffered,
        });
    }
}

pub struct DeviceBuilder {
    device: Device,
    site_types: HashMap<String, SiteTypeId>,
    tiles: HashMap<String, TileId>,
    node_wires: HashSet<NodeWire>,
}

impl DeviceBuilder {
    pub fn new(name: &str) -> Self {
        DeviceBuilder {
            device: Device::new(name.to_string()),
            site_types: HashMap::new(),
            tiles: HashMap::new(),
            node_wires: HashSet::new(),
        }
    }

    #[track_caller]
    pub fn add_site_type(&mut self, st: SiteTypeBuilder) -> SiteTypeId {
        let st = st.finish();
        if self.site_types.contains_key(&st.name) {
            panic!("duplicate site type {}", st.name);
        }
        let name = st.name.clone();
        let id = self.device.site_types.push(st);
        self.site_types.insert(name, id);
        id
    }

    #[track_caller]
    pub fn site_type(&self, name: &str) -> SiteTypeId {
        *self
            .site_types
            .get(name)
            .unwrap_or_else(|| panic!("unknown site type {name}"))
    }

    pub fn add_alt_site_type(&mut self, site_type: SiteTypeId, alt: SiteTypeId) {
        let alts = &mut self.device.site_types[site_type].alt_site_types;
        if !alts.contains(&alt) {
            alts.push(alt);
        }
    }

    #[track_caller]
    pub fn add_tile_type(&mut self, tt: TileTypeBuilder) -> TileTypeId {
        let tt = tt.tt;
        for site in tt.sites.values() {
            let st = &self.device.site_types[site.site_type];
            if st.pins.len() != site.pin_wires.len() {
                panic!(
                    "tile type {tt}: site type {st} has {n} pins, got {m} pin wires",
                    tt = tt.name,
                    st = st.name,
                    n = st.pins.len(),
                    m = site.pin_wires.len()
                );
            }
        }
        self.device.tile_types.push(tt)
    }

    #[track_caller]
    pub fn add_tile(
        &mut self,
        name: &str,
        tile_type: TileTypeId,
        row: u32,
        col: u32,
        sites: &[&str],
    ) -> TileId {
        if self.tiles.contains_key(name) {
            panic!("duplicate tile {name}");
        }
        let tt = &self.device.tile_types[tile_type];
        if tt.sites.len() != sites.len() {
            panic!(
                "tile {name} of type {tt} needs {n} site names",
                tt = tt.name,
                n = tt.sites.len()
            );
        }
        let mut site_names = EntityVec::new();
        for s in sites {
            site_names.push(s.to_string());
        }
        let id = self.device.tiles.push(Tile {
            name: name.to_string(),
            tile_type,
            row,
            col,
            sites: site_names,
        });
        self.tiles.insert(name.to_string(), id);
        id
    }

    #[track_caller]
    pub fn add_node(&mut self, wires: &[(&str, &str)]) -> NodeId {
        let mut node = Node { wires: vec![] };
        for &(tile, wire) in wires {
            let tid = *self
                .tiles
                .get(tile)
                .unwrap_or_else(|| panic!("unknown tile {tile}"));
            let tt = &self.device.tile_types[self.device.tiles[tid].tile_type];
            let wid = tt
                .wire(wire)
                .unwrap_or_else(|| panic!("unknown wire {tile}/{wire}"));
            let nw = NodeWire {
                tile: tid,
                wire: wid,
            };
            if !self.node_wires.insert(nw) {
                panic!("wire {tile}/{wire} already belongs to a node");
            }
            node.wires.push(nw);
        }
        self.device.nodes.push(node)
    }

    pub fn finish(self) -> Device {
        let mut device = self.device;
        device.post_deserialize();
        device
    }
}
