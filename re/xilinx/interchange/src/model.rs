use crate::db::Device;

/// Name-keyed routing queries answered both by an interchange database and
/// by a dump of a reference tool's live device.
///
/// Enumeration order is part of the contract: consumers walking two models
/// in lockstep rely on `tiles` and `wires_of_tile` being stable.
pub trait RoutingModel {
    fn tiles(&self) -> impl Iterator<Item = &str>;

    /// Empty for unknown tiles.
    fn wires_of_tile(&self, tile: &str) -> impl Iterator<Item = &str>;

    /// Empty for unknown tiles.
    fn sites_of_tile(&self, tile: &str) -> impl Iterator<Item = &str>;

    fn node_of_wire(&self, tile: &str, wire: &str) -> Option<String>;
}

impl RoutingModel for Device {
    fn tiles(&self) -> impl Iterator<Item = &str> {
        self.tiles.values().map(|t| t.name.as_str())
    }

    fn wires_of_tile(&self, tile: &str) -> impl Iterator<Item = &str> {
        self.tile(tile)
            .into_iter()
            .flat_map(move |t| self.tile_kind(t).wires.values().map(String::as_str))
    }

    fn sites_of_tile(&self, tile: &str) -> impl Iterator<Item = &str> {
        self.tile(tile)
            .into_iter()
            .flat_map(move |t| self.tiles[t].sites.values().map(String::as_str))
    }

    fn node_of_wire(&self, tile: &str, wire: &str) -> Option<String> {
        let t = self.tile(tile)?;
        let w = self.tile_kind(t).wire(wire)?;
        self.wire_node(t, w).map(|n| self.node_name(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{DeviceBuilder, SiteTypeBuilder, TileTypeBuilder};
    use crate::db::PinDir;

    fn device() -> Device {
        let mut b = DeviceBuilder::new("xc7tiny");
        let mut st = SiteTypeBuilder::new("SLICEL");
        st.site_pin("A1", PinDir::Input);
        b.add_site_type(st);
        let slicel = b.site_type("SLICEL");
        let mut tt = TileTypeBuilder::new("CLBLL_L");
        tt.site(slicel, &["CLBLL_L_A1"]);
        tt.site(slicel, &["CLBLL_LL_A1"]);
        tt.wire("CLBLL_L_SPARE");
        let clb = b.add_tile_type(tt);
        b.add_tile("CLBLL_L_X2Y0", clb, 0, 2, &["SLICE_X0Y0", "SLICE_X1Y0"]);
        b.add_tile("CLBLL_L_X2Y1", clb, 1, 2, &["SLICE_X0Y1", "SLICE_X1Y1"]);
        b.add_node(&[("CLBLL_L_X2Y1", "CLBLL_L_A1"), ("CLBLL_L_X2Y0", "CLBLL_L_SPARE")]);
        b.finish()
    }

    #[test]
    fn enumeration_order() {
        let dev = device();
        assert_eq!(
            dev.tiles().collect::<Vec<_>>(),
            ["CLBLL_L_X2Y0", "CLBLL_L_X2Y1"]
        );
        assert_eq!(
            dev.wires_of_tile("CLBLL_L_X2Y0").collect::<Vec<_>>(),
            ["CLBLL_L_A1", "CLBLL_LL_A1", "CLBLL_L_SPARE"]
        );
        assert_eq!(
            dev.sites_of_tile("CLBLL_L_X2Y1").collect::<Vec<_>>(),
            ["SLICE_X0Y1", "SLICE_X1Y1"]
        );
        assert_eq!(dev.wires_of_tile("NOPE").count(), 0);
        assert_eq!(dev.sites_of_tile("NOPE").count(), 0);
    }

    #[test]
    fn nodes() {
        let dev = device();
        assert_eq!(
            dev.node_of_wire("CLBLL_L_X2Y0", "CLBLL_L_SPARE").as_deref(),
            Some("CLBLL_L_X2Y1/CLBLL_L_A1")
        );
        assert_eq!(dev.node_of_wire("CLBLL_L_X2Y0", "CLBLL_L_A1"), None);
        assert_eq!(dev.node_of_wire("CLBLL_L_X2Y0", "NOPE"), None);
        assert_eq!(dev.node_of_wire("NOPE", "CLBLL_L_A1"), None);
    }
}
