#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotIr {
    pub stores: Vec<StoreIr>,
}

impl SnapshotIr {
    pub fn new(stores: Vec<StoreIr>) -> SnapshotIr {
        SnapshotIr { stores }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreIr {
    pub id: String,
    pub regions: Vec<RegionIr>,
}

impl StoreIr {
    pub fn new(id: String, regions: Option<Vec<RegionIr>>) -> StoreIr {
        StoreIr {
            id,
            regions: regions.unwrap_or_else(Vec::default),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionIr {
    pub id: String,
    pub vals: Vec<f64>,
}

impl RegionIr {
    pub fn new(id: String, vals: Vec<f64>) -> RegionIr {
        RegionIr { id, vals }
    }
}
