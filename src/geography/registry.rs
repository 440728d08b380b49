//! Immutable reference geography: the official provinces and districts of
//! Nepal, with alias tables for the spellings sources actually use.
//!
//! The tables consolidate what used to drift across independent scraper
//! scripts into one module, loaded once and never mutated afterwards.

use hashbrown::HashMap;
use serde::Serialize;

use crate::error::DedupeError;
use crate::normalize::{fold_ascii, normalize};

/// One official top-level region (province).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegionReference {
    /// Official province code, 1..=7.
    pub code: u8,
    pub name: &'static str,
    /// Historical designations, short forms and spelling variants.
    pub aliases: &'static [&'static str],
}

/// One official subdivision (district) of a region.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SubdivisionReference {
    pub region_code: u8,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

/// The seven provinces. Provinces carried number-only designations until
/// 2023, so the numeric forms remain common in source data.
pub const REGIONS: &[RegionReference] = &[
    RegionReference {
        code: 1,
        name: "Koshi",
        aliases: &[
            "Province 1",
            "Province No. 1",
            "Province No.1",
            "P1",
            "Pradesh 1",
            "Koshi Pradesh",
            "Kosi",
        ],
    },
    RegionReference {
        code: 2,
        name: "Madhesh",
        aliases: &[
            "Province 2",
            "Province No. 2",
            "Province No.2",
            "P2",
            "Pradesh 2",
            "Madhes",
            "Madhesh Pradesh",
        ],
    },
    RegionReference {
        code: 3,
        name: "Bagmati",
        aliases: &[
            "Province 3",
            "Province No. 3",
            "Province No.3",
            "P3",
            "Pradesh 3",
            "Bagmati Pradesh",
            "Bagamati",
        ],
    },
    RegionReference {
        code: 4,
        name: "Gandaki",
        aliases: &[
            "Province 4",
            "Province No. 4",
            "Province No.4",
            "P4",
            "Pradesh 4",
            "Gandaki Pradesh",
        ],
    },
    RegionReference {
        code: 5,
        name: "Lumbini",
        aliases: &[
            "Province 5",
            "Province No. 5",
            "Province No.5",
            "P5",
            "Pradesh 5",
            "Lumbini Pradesh",
        ],
    },
    RegionReference {
        code: 6,
        name: "Karnali",
        aliases: &[
            "Province 6",
            "Province No. 6",
            "Province No.6",
            "P6",
            "Pradesh 6",
            "Karnali Pradesh",
        ],
    },
    RegionReference {
        code: 7,
        name: "Sudurpashchim",
        aliases: &[
            "Province 7",
            "Province No. 7",
            "Province No.7",
            "P7",
            "Pradesh 7",
            "Sudurpashchim Pradesh",
            "Sudurpaschim",
            "Sudur Paschim",
            "Far Western",
            "Far-Western",
        ],
    },
];

/// The 77 districts. Alias lists carry the romanization variants seen in
/// real listings (`-chowk`/`-chok`, `-bastu`/`-vastu`, dropped aspirations)
/// and the pre-split Nawalparasi / Rukum names.
pub const SUBDIVISIONS: &[SubdivisionReference] = &[
    // Koshi
    sub(1, "Bhojpur", &[]),
    sub(1, "Dhankuta", &[]),
    sub(1, "Ilam", &["Illam"]),
    sub(1, "Jhapa", &[]),
    sub(1, "Khotang", &[]),
    sub(1, "Morang", &[]),
    sub(1, "Okhaldhunga", &["Okhaldunga"]),
    sub(1, "Panchthar", &["Panchathar"]),
    sub(1, "Sankhuwasabha", &["Sankhuwasava", "Sankhuwa Sabha"]),
    sub(1, "Solukhumbu", &["Solu Khumbu", "Solukhumbhu"]),
    sub(1, "Sunsari", &[]),
    sub(1, "Taplejung", &[]),
    sub(1, "Terhathum", &["Tehrathum", "Terathum"]),
    sub(1, "Udayapur", &["Udaypur"]),
    // Madhesh
    sub(2, "Bara", &[]),
    sub(2, "Dhanusha", &["Dhanusa"]),
    sub(2, "Mahottari", &["Mahotari"]),
    sub(2, "Parsa", &[]),
    sub(2, "Rautahat", &["Rauthat"]),
    sub(2, "Saptari", &[]),
    sub(2, "Sarlahi", &["Sarlahi District", "Sarlahee"]),
    sub(2, "Siraha", &["Sirha"]),
    // Bagmati
    sub(3, "Bhaktapur", &["Bhadgaon"]),
    sub(3, "Chitwan", &["Chitawan"]),
    sub(3, "Dhading", &[]),
    sub(3, "Dolakha", &["Dolkha"]),
    sub(3, "Kathmandu", &["KTM", "Kantipur"]),
    sub(3, "Kavrepalanchok", &["Kavrepalanchowk", "Kavre", "Kabhrepalanchok"]),
    sub(3, "Lalitpur", &["Patan"]),
    sub(3, "Makwanpur", &["Makawanpur"]),
    sub(3, "Nuwakot", &["Nuwakot District"]),
    sub(3, "Ramechhap", &["Ramechap"]),
    sub(3, "Rasuwa", &[]),
    sub(3, "Sindhuli", &[]),
    sub(3, "Sindhupalchok", &["Sindhupalchowk", "Sindhu Palchok"]),
    // Gandaki
    sub(4, "Baglung", &[]),
    sub(4, "Gorkha", &["Gorakha"]),
    sub(4, "Kaski", &[]),
    sub(4, "Lamjung", &[]),
    sub(4, "Manang", &[]),
    sub(4, "Mustang", &[]),
    sub(4, "Myagdi", &["Myagdee"]),
    sub(4, "Nawalpur", &["Nawalparasi East", "Nawalparasi (East)", "East Nawalparasi"]),
    sub(4, "Parbat", &["Parvat"]),
    sub(4, "Syangja", &["Syangja District", "Syanja"]),
    sub(4, "Tanahun", &["Tanahu"]),
    // Lumbini
    sub(5, "Arghakhanchi", &["Arghakhanchi District"]),
    sub(5, "Banke", &[]),
    sub(5, "Bardiya", &["Bardia"]),
    sub(5, "Dang", &["Dang Deukhuri"]),
    sub(5, "Gulmi", &[]),
    sub(5, "Kapilvastu", &["Kapilbastu"]),
    sub(5, "Palpa", &[]),
    sub(5, "Parasi", &["Nawalparasi West", "Nawalparasi (West)", "West Nawalparasi"]),
    sub(5, "Pyuthan", &[]),
    sub(5, "Rolpa", &[]),
    sub(5, "Rukum East", &["Eastern Rukum", "Rukum Purba"]),
    sub(5, "Rupandehi", &["Rupendehi"]),
    // Karnali
    sub(6, "Dailekh", &["Dailek"]),
    sub(6, "Dolpa", &["Dolpo"]),
    sub(6, "Humla", &[]),
    sub(6, "Jajarkot", &[]),
    sub(6, "Jumla", &[]),
    sub(6, "Kalikot", &[]),
    sub(6, "Mugu", &[]),
    sub(6, "Salyan", &["Sallyan"]),
    sub(6, "Surkhet", &[]),
    sub(6, "Rukum West", &["Western Rukum", "Rukum Paschim"]),
    // Sudurpashchim
    sub(7, "Achham", &["Acham"]),
    sub(7, "Baitadi", &[]),
    sub(7, "Bajhang", &[]),
    sub(7, "Bajura", &[]),
    sub(7, "Dadeldhura", &["Dadeldura"]),
    sub(7, "Darchula", &[]),
    sub(7, "Doti", &["Dipayal"]),
    sub(7, "Kailali", &[]),
    sub(7, "Kanchanpur", &["Kanchanpur District"]),
];

const fn sub(
    region_code: u8,
    name: &'static str,
    aliases: &'static [&'static str],
) -> SubdivisionReference {
    SubdivisionReference {
        region_code,
        name,
        aliases,
    }
}

/// The loaded reference geography with precomputed lookup tables.
///
/// Built once at process start and shared read-only; there is no API for
/// runtime mutation.
#[derive(Debug)]
pub struct GeographyRegistry {
    regions: &'static [RegionReference],
    subdivisions: Vec<SubdivisionReference>,

    region_exact: HashMap<String, u8>,
    region_alias: HashMap<String, u8>,
    region_folded: HashMap<String, u8>,

    // Subdivision maps point at indices into `subdivisions`, which is kept
    // sorted by (region_code, name) so "first match" is deterministic.
    sub_exact: HashMap<String, Vec<usize>>,
    sub_alias: HashMap<String, Vec<usize>>,
    sub_folded: HashMap<String, Vec<usize>>,
}

impl GeographyRegistry {
    /// Load the built-in Nepal reference data.
    pub fn nepal() -> Result<Self, DedupeError> {
        Self::new(REGIONS, SUBDIVISIONS)
    }

    /// Build a registry from reference tables, validating them.
    pub fn new(
        regions: &'static [RegionReference],
        subdivisions: &'static [SubdivisionReference],
    ) -> Result<Self, DedupeError> {
        if regions.is_empty() {
            return Err(DedupeError::Registry("no regions defined".to_string()));
        }

        let mut region_exact = HashMap::new();
        let mut region_alias = HashMap::new();
        let mut region_folded = HashMap::new();

        for region in regions {
            if region_exact
                .insert(normalize(region.name), region.code)
                .is_some()
            {
                return Err(DedupeError::Registry(format!(
                    "duplicate region name: {}",
                    region.name
                )));
            }
            if regions.iter().filter(|r| r.code == region.code).count() != 1 {
                return Err(DedupeError::Registry(format!(
                    "duplicate region code: {}",
                    region.code
                )));
            }
            region_folded.insert(fold_ascii(region.name), region.code);
            for alias in region.aliases {
                region_alias.insert(normalize(alias), region.code);
                region_folded.insert(fold_ascii(alias), region.code);
            }
        }

        let mut subdivisions: Vec<SubdivisionReference> = subdivisions.to_vec();
        subdivisions.sort_by(|a, b| (a.region_code, a.name).cmp(&(b.region_code, b.name)));

        let mut sub_exact: HashMap<String, Vec<usize>> = HashMap::new();
        let mut sub_alias: HashMap<String, Vec<usize>> = HashMap::new();
        let mut sub_folded: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, sub) in subdivisions.iter().enumerate() {
            if !regions.iter().any(|r| r.code == sub.region_code) {
                return Err(DedupeError::Registry(format!(
                    "subdivision {} references unknown region code {}",
                    sub.name, sub.region_code
                )));
            }
            sub_exact.entry(normalize(sub.name)).or_default().push(idx);
            sub_folded
                .entry(fold_ascii(sub.name))
                .or_default()
                .push(idx);
            for alias in sub.aliases {
                sub_alias.entry(normalize(alias)).or_default().push(idx);
                sub_folded.entry(fold_ascii(alias)).or_default().push(idx);
            }
        }

        Ok(Self {
            regions,
            subdivisions,
            region_exact,
            region_alias,
            region_folded,
            sub_exact,
            sub_alias,
            sub_folded,
        })
    }

    pub fn regions(&self) -> &[RegionReference] {
        self.regions
    }

    /// Subdivisions sorted by (region code, name).
    pub fn subdivisions(&self) -> &[SubdivisionReference] {
        &self.subdivisions
    }

    pub fn region_by_code(&self, code: u8) -> Option<&RegionReference> {
        self.regions.iter().find(|r| r.code == code)
    }

    pub fn is_valid_code(&self, code: u8) -> bool {
        self.region_by_code(code).is_some()
    }

    pub fn subdivisions_of(&self, code: u8) -> impl Iterator<Item = &SubdivisionReference> {
        self.subdivisions
            .iter()
            .filter(move |s| s.region_code == code)
    }

    pub(crate) fn region_exact(&self, normalized: &str) -> Option<u8> {
        self.region_exact.get(normalized).copied()
    }

    pub(crate) fn region_alias(&self, normalized: &str) -> Option<u8> {
        self.region_alias.get(normalized).copied()
    }

    pub(crate) fn region_folded(&self, folded: &str) -> Option<u8> {
        self.region_folded.get(folded).copied()
    }

    pub(crate) fn sub_exact(&self, normalized: &str, region: Option<u8>) -> Option<&SubdivisionReference> {
        self.pick_sub(self.sub_exact.get(normalized), region)
    }

    pub(crate) fn sub_alias(&self, normalized: &str, region: Option<u8>) -> Option<&SubdivisionReference> {
        self.pick_sub(self.sub_alias.get(normalized), region)
    }

    pub(crate) fn sub_folded(&self, folded: &str, region: Option<u8>) -> Option<&SubdivisionReference> {
        self.pick_sub(self.sub_folded.get(folded), region)
    }

    /// First hit in (region_code, name) order, scoped to `region` if given.
    /// Cross-region name collisions are not disambiguated beyond that order.
    fn pick_sub(
        &self,
        indices: Option<&Vec<usize>>,
        region: Option<u8>,
    ) -> Option<&SubdivisionReference> {
        indices?
            .iter()
            .map(|&i| &self.subdivisions[i])
            .find(|s| region.map_or(true, |code| s.region_code == code))
    }
}
