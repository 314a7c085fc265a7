// urraca is a disk intelligence and cleanup tool
// Copyright (C) 2025  Javier Lancha Vázquez <javier.lancha@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::Serialize;

use crate::{
    global::defaults::{
        DEFAULT_CO2_KG_PER_KWH, DEFAULT_KWH_PER_GB_YEAR, DEFAULT_LAPTOP_KWH_PER_HOUR,
    },
    utils::{self, size},
};

/// Factors for the storage footprint model. The defaults are rough
/// blended estimates; callers may override them from configuration.
#[derive(Debug, Clone, Serialize)]
pub struct CarbonFactors {
    pub kwh_per_gb_year: f64,
    pub co2_kg_per_kwh: f64,
    pub laptop_kwh_per_hour: f64,
}

impl Default for CarbonFactors {
    fn default() -> Self {
        Self {
            kwh_per_gb_year: DEFAULT_KWH_PER_GB_YEAR,
            co2_kg_per_kwh: DEFAULT_CO2_KG_PER_KWH,
            laptop_kwh_per_hour: DEFAULT_LAPTOP_KWH_PER_HOUR,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CarbonReport {
    pub stored_bytes: u64,
    pub stored_human: String,
    pub stored_gb: f64,
    pub estimated_annual_energy_kwh: f64,
    pub estimated_annual_co2_kg: f64,
    pub context_equivalent_laptop_hours: f64,
    pub assumptions: Vec<String>,
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Estimate the annual energy and CO2 footprint of keeping `total_bytes`
/// stored. An estimation, not a measurement.
pub fn estimate(total_bytes: u64, factors: &CarbonFactors) -> CarbonReport {
    let gb = total_bytes as f64 / size::GiB as f64;
    let annual_kwh = gb * factors.kwh_per_gb_year;
    let annual_co2_kg = annual_kwh * factors.co2_kg_per_kwh;
    let laptop_hours = if factors.laptop_kwh_per_hour > 0.0 {
        annual_kwh / factors.laptop_kwh_per_hour
    } else {
        0.0
    };

    CarbonReport {
        stored_bytes: total_bytes,
        stored_human: utils::format_size(total_bytes),
        stored_gb: round_to(gb, 3),
        estimated_annual_energy_kwh: round_to(annual_kwh, 3),
        estimated_annual_co2_kg: round_to(annual_co2_kg, 3),
        context_equivalent_laptop_hours: round_to(laptop_hours, 2),
        assumptions: vec![
            "This is an estimation, not a direct measurement.".to_string(),
            format!(
                "Energy factor assumed: {} kWh per GB-year.",
                factors.kwh_per_gb_year
            ),
            format!(
                "Grid carbon factor assumed: {} kg CO2 per kWh.",
                factors.co2_kg_per_kwh
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_with_default_factors() {
        let report = estimate(10 * size::GiB, &CarbonFactors::default());
        assert_eq!(report.stored_gb, 10.0);
        assert_eq!(report.estimated_annual_energy_kwh, 6.5);
        assert_eq!(report.estimated_annual_co2_kg, 2.6);
        assert_eq!(report.context_equivalent_laptop_hours, 108.33);
        assert_eq!(report.assumptions.len(), 3);
    }

    #[test]
    fn test_zero_bytes() {
        let report = estimate(0, &CarbonFactors::default());
        assert_eq!(report.stored_gb, 0.0);
        assert_eq!(report.estimated_annual_co2_kg, 0.0);
    }

    #[test]
    fn test_custom_factors() {
        let factors = CarbonFactors {
            kwh_per_gb_year: 1.0,
            co2_kg_per_kwh: 1.0,
            laptop_kwh_per_hour: 0.0,
        };
        let report = estimate(size::GiB, &factors);
        assert_eq!(report.estimated_annual_energy_kwh, 1.0);
        assert_eq!(report.estimated_annual_co2_kg, 1.0);
        assert_eq!(report.context_equivalent_laptop_hours, 0.0);
    }
}
