use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;
use unnamed_entity::{EntityId, EntityVec, entity_id};

entity_id! {
    pub id SiteTypeId u16;
    pub id TileTypeId u16;
    pub id TileId u32;
    pub id NodeId u32;
    pub id SitePinId u16;
    pub id BelId u16;
    pub id BelPinId u16;
    pub id SiteWireId u16;
    pub id TtWireId u32;
    pub id TtSiteId u16;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PinDir {
    Input,
    Output,
    Inout,
}

impl PinDir {
    pub fn as_str(self) -> &'static str {
        match self {
            PinDir::Input => "input",
            PinDir::Output => "output",
            PinDir::Inout => "inout",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BelCategory {
    Logic,
    Routing,
    SitePort,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SitePin {
    pub name: String,
    pub dir: PinDir,
    /// The pin of the port BEL standing for this site pin.
    pub bel_pin: BelPinId,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Bel {
    pub name: String,
    pub category: BelCategory,
    pub pins: Vec<BelPinId>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BelPin {
    pub name: String,
    pub bel: BelId,
    pub dir: PinDir,
    pub wire: Option<SiteWireId>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SiteWire {
    pub name: String,
    pub pins: Vec<BelPinId>,
}

/// A primitive definition: the template every site of this type instantiates.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SiteType {
    pub name: String,
    pub pins: EntityVec<SitePinId, SitePin>,
    pub bels: EntityVec<BelId, Bel>,
    pub bel_pins: EntityVec<BelPinId, BelPin>,
    pub wires: EntityVec<SiteWireId, SiteWire>,
    pub alt_site_types: Vec<SiteTypeId>,
}

impl SiteType {
    pub fn pin(&self, name: &str) -> Option<SitePinId> {
        self.pins
            .iter()
            .find(|(_, pin)| pin.name == name)
            .map(|(id, _)| id)
    }

    pub fn bel(&self, name: &str) -> Option<BelId> {
        self.bels
            .iter()
            .find(|(_, bel)| bel.name == name)
            .map(|(id, _)| id)
    }

    pub fn bel_pin(&self, bel: BelId, name: &str) -> Option<BelPinId> {
        self.bels[bel]
            .pins
            .iter()
            .copied()
            .find(|&bp| self.bel_pins[bp].name == name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TtSite {
    pub site_type: SiteTypeId,
    /// Tile wire each site pin of the primary site type lands on.
    pub pin_wires: EntityVec<SitePinId, TtWireId>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TtPip {
    pub wire_from: TtWireId,
    pub wire_to: TtWireId,
    pub directional: bool,
    pub buffered: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TileType {
    pub name: String,
    pub wires: EntityVec<TtWireId, String>,
    pub sites: EntityVec<TtSiteId, TtSite>,
    pub pips: Vec<TtPip>,
    #[serde(skip)]
    pub(crate) wire_lookup: HashMap<String, TtWireId>,
}

impl TileType {
    pub fn wire(&self, name: &str) -> Option<TtWireId> {
        self.wire_lookup.get(name).copied()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub name: String,
    pub tile_type: TileTypeId,
    pub row: u32,
    pub col: u32,
    pub sites: EntityVec<TtSiteId, String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NodeWire {
    pub tile: TileId,
    pub wire: TtWireId,
}

/// A maximal set of electrically connected tile wires.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub wires: Vec<NodeWire>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
struct DeviceIndex {
    site_types: HashMap<String, SiteTypeId>,
    tile_types: HashMap<String, TileTypeId>,
    tiles: HashMap<String, TileId>,
    wire_nodes: HashMap<NodeWire, NodeId>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub site_types: EntityVec<SiteTypeId, SiteType>,
    pub tile_types: EntityVec<TileTypeId, TileType>,
    /// Tiles in the device's native enumeration order.
    pub tiles: EntityVec<TileId, Tile>,
    pub nodes: EntityVec<NodeId, Node>,
    #[serde(skip)]
    index: DeviceIndex,
}

impl Device {
    pub(crate) fn new(name: String) -> Self {
        Device {
            name,
            site_types: EntityVec::new(),
            tile_types: EntityVec::new(),
            tiles: EntityVec::new(),
            nodes: EntityVec::new(),
            index: DeviceIndex::default(),
        }
    }

    /// Rebuilds the name and node lookups, which are not serialized.
    pub fn post_deserialize(&mut self) {
        let mut index = DeviceIndex::default();
        for (id, st) in self.site_types.iter() {
            index.site_types.insert(st.name.clone(), id);
        }
        for (id, tt) in self.tile_types.iter_mut() {
            index.tile_types.insert(tt.name.clone(), id);
            tt.wire_lookup = tt
                .wires
                .iter()
                .map(|(wid, name)| (name.clone(), wid))
                .collect();
        }
        for (id, tile) in self.tiles.iter() {
            index.tiles.insert(tile.name.clone(), id);
        }
        for (id, node) in self.nodes.iter() {
            for &nw in &node.wires {
                index.wire_nodes.insert(nw, id);
            }
        }
        self.index = index;
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let f = File::open(path).map_err(io_err)?;
        let mut cf = zstd::stream::Decoder::new(f).map_err(io_err)?;
        let config = bincode::config::legacy();
        let mut res: Device =
            bincode::serde::decode_from_std_read(&mut cf, config).map_err(|source| {
                Error::Decode {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        res.post_deserialize();
        debug!(
            "loaded device {name}: {nt} tiles, {nn} nodes",
            name = res.name,
            nt = res.tiles.len(),
            nn = res.nodes.len()
        );
        Ok(res)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let f = File::create(path).map_err(io_err)?;
        let mut cf = zstd::stream::Encoder::new(f, 9).map_err(io_err)?;
        let config = bincode::config::legacy();
        bincode::serde::encode_into_std_write(self, &mut cf, config).map_err(|source| {
            Error::Encode {
                path: path.to_path_buf(),
                source,
            }
        })?;
        cf.finish().map_err(io_err)?;
        Ok(())
    }

    pub fn tile(&self, name: &str) -> Option<TileId> {
        self.index.tiles.get(name).copied()
    }

    pub fn site_type(&self, name: &str) -> Option<SiteTypeId> {
        self.index.site_types.get(name).copied()
    }

    pub fn tile_type(&self, name: &str) -> Option<TileTypeId> {
        self.index.tile_types.get(name).copied()
    }

    pub fn tile_kind(&self, tile: TileId) -> &TileType {
        &self.tile_types[self.tiles[tile].tile_type]
    }

    pub fn wire_node(&self, tile: TileId, wire: TtWireId) -> Option<NodeId> {
        self.index
            .wire_nodes
            .get(&NodeWire { tile, wire })
            .copied()
    }

    pub fn wire_name(&self, nw: NodeWire) -> &str {
        &self.tile_kind(nw.tile).wires[nw.wire]
    }

    /// Nodes are named after their first wire, the way Vivado names them.
    pub fn node_name(&self, node: NodeId) -> String {
        match self.nodes[node].wires.first() {
            Some(&nw) => format!("{}/{}", self.tiles[nw.tile].name, self.wire_name(nw)),
            None => format!("NODE{}", node.to_idx()),
        }
    }

    /// Grid size as (rows, columns).
    pub fn dims(&self) -> (u32, u32) {
        let rows = self.tiles.values().map(|t| t.row + 1).max().unwrap_or(0);
        let cols = self.tiles.values().map(|t| t.col + 1).max().unwrap_or(0);
        (rows, cols)
    }
}
