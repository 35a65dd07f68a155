//! Empirical constants, loadable from JSON
//!
//! Every field has a default, so a tuning file only needs the values it
//! changes:
//!
//! ```json
//! { "trace": { "max_steps": 128 }, "taa": { "blend": 0.1 } }
//! ```

use lustre_sdf::GlobeGeometry;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::camera::ViewConfig;
use crate::interact::InteractionConfig;
use crate::shade::ShadingConfig;
use crate::taa::TaaConfig;
use crate::trace::TraceConfig;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub trace: TraceConfig,
    pub shading: ShadingConfig,
    pub taa: TaaConfig,
    pub interaction: InteractionConfig,
    pub globe: GlobeGeometry,
    pub view: ViewConfig,
}

impl Tuning {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would make the tracer, the blend or the spring
    /// misbehave
    pub fn validate(&self) -> Result<()> {
        let t = &self.trace;
        check(t.max_steps > 0, "trace.max_steps must be positive")?;
        check(t.hit_epsilon > 0.0, "trace.hit_epsilon must be positive")?;
        check(t.max_distance > 0.0, "trace.max_distance must be positive")?;
        check(
            t.damping > 0.0 && t.damping <= 1.0,
            "trace.damping must be in (0, 1]",
        )?;

        check(
            self.taa.blend > 0.0 && self.taa.blend <= 1.0,
            "taa.blend must be in (0, 1]",
        )?;

        let i = &self.interaction;
        check(
            i.smoothing > 0.0 && i.smoothing <= 1.0,
            "interaction.smoothing must be in (0, 1]",
        )?;
        check(i.gyro_range > 0.0, "interaction.gyro_range must be positive")?;
        check(i.listen_timeout >= 0.0, "interaction.listen_timeout must not be negative")?;
        check(
            i.kick_stiffness > 0.0 && i.kick_damping >= 0.0,
            "interaction kick spring must have positive stiffness",
        )?;
        check(i.kick_max_dt > 0.0, "interaction.kick_max_dt must be positive")?;

        let g = &self.globe;
        check(g.grid_lines > 0, "globe.grid_lines must be positive")?;
        check(
            g.land_thickness > 0.0 && g.land_thickness < g.radius,
            "globe.land_thickness must be inside the radius",
        )?;
        check(g.grid_radius() > 0.0, "globe grid rings must fit inside the land shell")?;

        check(
            self.view.distance > g.radius,
            "view.distance must put the eye outside the globe",
        )?;
        check(self.view.focal_length > 0.0, "view.focal_length must be positive")?;
        Ok(())
    }
}

fn check(ok: bool, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::Config(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_are_valid() {
        Tuning::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let t = Tuning::from_json_str(r#"{ "trace": { "max_steps": 128 } }"#).unwrap();
        assert_eq!(t.trace.max_steps, 128);
        assert_relative_eq!(t.trace.hit_epsilon, 0.03);
        assert_relative_eq!(t.taa.blend, 0.2);
        assert_eq!(t.globe.grid_lines, 26);
    }

    #[test]
    fn out_of_range_blend_is_rejected() {
        let err = Tuning::from_json_str(r#"{ "taa": { "blend": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = Tuning::from_json_str("{ trace: ").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn json_round_trip() {
        let t = Tuning::default();
        let back = Tuning::from_json_str(&t.to_json().unwrap()).unwrap();
        assert_eq!(t, back);
    }
}
