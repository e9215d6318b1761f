//! Node color generation

use std::collections::{BTreeSet, HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Hands out distinct `#rrggbb` colors
pub struct ColorAssigner {
    rng: StdRng,
    used: HashSet<u32>,
}

impl ColorAssigner {
    /// Seeded for reproducible output; `None` draws from entropy
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            used: HashSet::new(),
        }
    }

    /// A random color not handed out before by this assigner
    pub fn next_color(&mut self) -> String {
        loop {
            let value = self.rng.gen_range(0..=0xFF_FFFFu32);
            if self.used.insert(value) {
                return format!("#{value:06x}");
            }
        }
    }

    /// One color per distinct type, assigned in sorted type order
    pub fn palette<'a>(&mut self, types: impl IntoIterator<Item = &'a str>) -> HashMap<String, String> {
        let distinct: BTreeSet<&str> = types.into_iter().collect();
        distinct
            .into_iter()
            .map(|t| (t.to_string(), self.next_color()))
            .collect()
    }
}
