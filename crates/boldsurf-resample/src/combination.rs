//! Expansion of a config into individual outputs, and running them.

use std::fmt;

use boldsurf_core::resample::ResampledSeries;
use boldsurf_core::SplineOrder;
use tracing::info;

use crate::config::ResampleConfig;
use crate::error::{ResampleError, Result};
use crate::hemisphere::{Hemi, Hemisphere, ProjectionType, NATIVE};
use crate::session::InterpolationSession;

/// What a combination samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Surface {
        hemi: Hemi,
        space: String,
        projection: ProjectionType,
        /// Transport onto the standard sphere.
        standard: bool,
    },
    Volume,
}

/// One output: a target sampled at one spline order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    pub target: Target,
    pub order: SplineOrder,
}

impl Combination {
    pub fn surface(hemi: Hemi, space: impl Into<String>, projection: ProjectionType, standard: bool, order: SplineOrder) -> Self {
        Self {
            target: Target::Surface {
                hemi,
                space: space.into(),
                projection,
                standard,
            },
            order,
        }
    }

    pub fn volume(order: SplineOrder) -> Self {
        Self {
            target: Target::Volume,
            order,
        }
    }

    /// Deterministic file stem, e.g. `lh_native_normals-sine_order-3_fsavg`.
    pub fn label(&self) -> String {
        match &self.target {
            Target::Surface {
                hemi,
                space,
                projection,
                standard,
            } => {
                let mut label = format!("{}_{}_{}_order-{}", hemi, space, projection, self.order);
                if *standard {
                    label.push_str("_fsavg");
                }
                label
            }
            Target::Volume => format!("volume_order-{}", self.order),
        }
    }

    /// Every surface combination of hemisphere × projection × order on the
    /// native space, followed by one volume combination per order when
    /// enabled.
    pub fn expand(config: &ResampleConfig) -> Result<Vec<Combination>> {
        let orders = config.spline_orders()?;
        let mut combos = Vec::new();
        for &hemi in &config.hemispheres {
            for &projection in &config.projections {
                for &order in &orders {
                    combos.push(Self::surface(hemi, NATIVE, projection, config.standard_space, order));
                }
            }
        }
        if config.volume {
            combos.extend(orders.iter().map(|&order| Self::volume(order)));
        }
        Ok(combos)
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Run `combos` in order and pair each result with its label.
///
/// # Errors
/// If a surface combination names a hemisphere missing from `hemispheres`,
/// or any interpolation fails.
pub fn run_combinations(
    session: &InterpolationSession,
    hemispheres: &[Hemisphere],
    combos: &[Combination],
) -> Result<Vec<(String, ResampledSeries)>> {
    let mut results = Vec::with_capacity(combos.len());
    for (i, combo) in combos.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, combos.len(), combo);
        let series = match &combo.target {
            Target::Surface {
                hemi,
                space,
                projection,
                standard,
            } => {
                let hemisphere = hemispheres
                    .iter()
                    .find(|h| h.hemi() == *hemi)
                    .ok_or_else(|| ResampleError::invalid_config(format!("hemisphere {hemi} is not loaded")))?;
                let space = hemisphere.space(space)?;
                session.interpolate_surface(space, *projection, *standard, combo.order)?
            }
            Target::Volume => session.interpolate_volume(combo.order)?,
        };
        results.push((combo.label(), series));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn order(n: u8) -> SplineOrder {
        SplineOrder::new(n).unwrap()
    }

    #[test]
    fn test_labels() {
        let c = Combination::surface(Hemi::Left, NATIVE, ProjectionType::NormalsSine, true, order(3));
        assert_eq!(c.label(), "lh_native_normals-sine_order-3_fsavg");
        let c = Combination::surface(Hemi::Right, "fsavg6", ProjectionType::Pial, false, order(0));
        assert_eq!(c.label(), "rh_fsavg6_pial_order-0");
        assert_eq!(Combination::volume(order(1)).label(), "volume_order-1");
    }

    #[test]
    fn test_expand_is_cartesian_product() {
        let config = ResampleConfig::new("01", "/fs", "/wf", "/out")
            .with_projections(vec![ProjectionType::NormalsSine, ProjectionType::Pial])
            .with_orders(vec![3, 1])
            .with_volume();
        let combos = Combination::expand(&config).unwrap();
        let labels: Vec<String> = combos.iter().map(Combination::label).collect();
        assert_eq!(
            labels,
            vec![
                "lh_native_normals-sine_order-1_fsavg",
                "lh_native_normals-sine_order-3_fsavg",
                "lh_native_pial_order-1_fsavg",
                "lh_native_pial_order-3_fsavg",
                "rh_native_normals-sine_order-1_fsavg",
                "rh_native_normals-sine_order-3_fsavg",
                "rh_native_pial_order-1_fsavg",
                "rh_native_pial_order-3_fsavg",
                "volume_order-1",
                "volume_order-3",
            ]
        );
    }

    #[test]
    fn test_expand_rejects_invalid_order() {
        let config = ResampleConfig::new("01", "/fs", "/wf", "/out").with_orders(vec![9]);
        assert!(matches!(
            Combination::expand(&config),
            Err(ResampleError::InvalidOrder(9))
        ));
    }

    proptest! {
        #[test]
        fn prop_expanded_labels_are_unique(
            hemis in proptest::sample::subsequence(Hemi::BOTH.to_vec(), 0..=2),
            projections in proptest::sample::subsequence(ProjectionType::ALL.to_vec(), 0..=3),
            orders in proptest::collection::vec(0u8..=5, 1..6),
            standard in any::<bool>(),
            volume in any::<bool>(),
        ) {
            let mut config = ResampleConfig::new("01", "/fs", "/wf", "/out")
                .with_hemispheres(hemis.clone())
                .with_projections(projections.clone())
                .with_orders(orders.clone());
            config.standard_space = standard;
            config.volume = volume;

            let combos = Combination::expand(&config).unwrap();
            let distinct_orders = orders.iter().collect::<BTreeSet<_>>().len();
            let expected = distinct_orders * (hemis.len() * projections.len() + usize::from(volume));
            prop_assert_eq!(combos.len(), expected);

            let labels: BTreeSet<String> = combos.iter().map(Combination::label).collect();
            prop_assert_eq!(labels.len(), combos.len());
        }
    }
}
