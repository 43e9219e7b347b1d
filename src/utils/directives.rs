//! Catalog of the edits the harness knows how to make to `config.tcl`.
//!
//! The anchors and line offsets mirror the document layout the Avalanche
//! exporter produces. They are a contract with that tool version and are kept
//! exactly as the exporter lays things out.

use super::patch::{anchor, Directive, ProfileScope, Replacement};

/// Config layout the offsets below were taken from.
pub const LAYOUT_VERSION: &str = "avalanche-tcl/1";

/// `.clientSubnet {name}` is followed directly by its `enabled {..}` line.
pub const SUBNET_ENABLED_OFFSET: usize = 1;
/// Ramp phases keep their duration 5 lines below the label.
pub const RAMP_DURATION_OFFSET: usize = 5;
/// Steady phases keep their duration 6 lines below the label.
pub const STEADY_DURATION_OFFSET: usize = 6;

pub fn reserve_ports(force: bool) -> Directive {
    Directive::new(
        "reserve-ports",
        vec![anchor(r"ReserveForce\s+\d")],
        Replacement::Flag(force),
    )
}

pub fn license(path: &str) -> Directive {
    Directive::new(
        "license",
        vec![anchor(r"License\s+\{")],
        Replacement::Payload(path.to_owned()),
    )
}

pub fn output_dir(path: &str) -> Directive {
    Directive::new(
        "output-dir",
        vec![anchor(r"OutputDir\s+\{")],
        Replacement::Payload(path.to_owned()),
    )
}

pub fn trial_mode(on: bool) -> Directive {
    Directive::new("trial-mode", vec![anchor(r"\bTrial\s+\d")], Replacement::Flag(on))
}

// The leading `.` matches any separator (`.` or `-`) in front of the key.
fn association_anchors() -> Vec<regex::Regex> {
    vec![
        anchor(r".client.userBasedAssociations.association\(\d+\).enabled"),
        anchor(r".client.globalAssociations.association\(\d+\).enabled"),
    ]
}

pub fn enable_all_associations() -> Directive {
    Directive::new(
        "associations-enable-all",
        association_anchors(),
        Replacement::Payload("true".into()),
    )
}

pub fn disable_all_associations() -> Directive {
    Directive::new(
        "associations-disable-all",
        association_anchors(),
        Replacement::Payload("false".into()),
    )
}

pub fn enable_association(subnet: &str) -> Directive {
    Directive::new(
        format!("associations-enable:{}", subnet),
        vec![anchor(&format!(r".clientSubnet\s+\{{{}\}}", regex::escape(subnet)))],
        Replacement::Payload("true".into()),
    )
    .with_offset(SUBNET_ENABLED_OFFSET)
}

pub fn ramp_up(secs: u64) -> Directive {
    Directive::new(
        "runtime-ramp-up",
        vec![anchor(r"\{Ramp ?Up\}")],
        Replacement::Payload(secs.to_string()),
    )
    .with_offset(RAMP_DURATION_OFFSET)
}

pub fn ramp_down(secs: u64) -> Directive {
    Directive::new(
        "runtime-ramp-down",
        vec![anchor(r"\{Ramp ?Down\}")],
        Replacement::Payload(secs.to_string()),
    )
    .with_offset(RAMP_DURATION_OFFSET)
}

pub fn steady(secs: u64) -> Directive {
    Directive::new(
        "runtime-steady",
        vec![anchor(r"\{(?:Soak|Steady ?State)\}")],
        Replacement::Payload(secs.to_string()),
    )
    .with_offset(STEADY_DURATION_OFFSET)
}

/// Which client associations should be left enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Associations {
    All,
    /// disable everything, then enable the listed subnets in order
    Only(Vec<String>),
}

impl Associations {
    pub fn directives(&self) -> Vec<Directive> {
        match self {
            Associations::All => vec![enable_all_associations()],
            Associations::Only(subnets) => std::iter::once(disable_all_associations())
                .chain(subnets.iter().map(|s| enable_association(s)))
                .collect(),
        }
    }
}

/// Phase durations in seconds, optionally limited to some load profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Runtime {
    pub ramp_up: Option<u64>,
    pub steady: Option<u64>,
    pub ramp_down: Option<u64>,
    /// empty means every profile
    pub profiles: Vec<String>,
}

impl Runtime {
    pub fn directives(&self) -> Vec<Directive> {
        let scope = (!self.profiles.is_empty()).then(|| ProfileScope::new(self.profiles.clone()));

        [
            self.ramp_up.map(ramp_up),
            self.steady.map(steady),
            self.ramp_down.map(ramp_down),
        ]
        .into_iter()
        .flatten()
        .map(|d| match &scope {
            Some(s) => d.scoped(s.clone()),
            None => d,
        })
        .collect()
    }
}

/// Every edit for one config file, expanded in catalog order.
#[derive(Debug, Clone, Default)]
pub struct ConfigPlan {
    pub reserve_ports: Option<bool>,
    pub license: Option<String>,
    pub output_dir: Option<String>,
    pub trial_mode: Option<bool>,
    pub associations: Option<Associations>,
    pub runtime: Runtime,
}

impl ConfigPlan {
    pub fn directives(&self) -> Vec<Directive> {
        let mut out = Vec::new();
        out.extend(self.reserve_ports.map(reserve_ports));
        out.extend(self.license.as_deref().map(license));
        out.extend(self.output_dir.as_deref().map(output_dir));
        out.extend(self.trial_mode.map(trial_mode));
        if let Some(a) = &self.associations {
            out.extend(a.directives());
        }
        out.extend(self.runtime.directives());
        out
    }

    pub fn is_empty(&self) -> bool {
        self.directives().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PatchError;
    use crate::utils::{config_file::split_lines, patch::apply_directive};
    use pretty_assertions::assert_eq;

    fn apply_all(doc: &str, directives: &[Directive]) -> String {
        let mut lines = split_lines(doc);
        for d in directives {
            lines = apply_directive(&lines, d).unwrap().lines;
        }
        lines.concat()
    }

    const ASSOCIATIONS: &str = "\
$client configure -clientSubnet {Slot3}\n\
$client configure -client.userBasedAssociations.association(0).enabled {true}\n\
$client configure -clientSubnet {Slot4}\n\
$client configure -client.userBasedAssociations.association(1).enabled {true}\n\
$client configure -client.globalAssociations.association(0).enabled {true}\n";

    const PROFILES: &str = "\
$lp configure -loadProfile {Web}\n\
$lp configure -phase(1).label {Ramp Up}\n\
  -phase(1).type {stair}\n\
  -phase(1).height {10}\n\
  -phase(1).rampTime {0}\n\
  -phase(1).repetitions {1}\n\
  -phase(1).steadyTime {10}\n\
$lp configure -phase(2).label {Steady State}\n\
  -phase(2).type {stair}\n\
  -phase(2).height {10}\n\
  -phase(2).rampTime {0}\n\
  -phase(2).repetitions {1}\n\
  -phase(2).height2 {0}\n\
  -phase(2).steadyTime {60}\n\
$lp configure -loadProfile {Ftp}\n\
$lp configure -phase(1).label {RampUp}\n\
  -phase(1).type {stair}\n\
  -phase(1).height {10}\n\
  -phase(1).rampTime {0}\n\
  -phase(1).repetitions {1}\n\
  -phase(1).steadyTime {10}\n";

    #[test]
    fn test_reserve_ports_roundtrip() {
        let doc = "av::config $test -ReserveForce 0 -Port 7\n";
        let on = apply_all(doc, &[reserve_ports(true)]);
        assert_eq!(on, "av::config $test -ReserveForce 1 -Port 7\n");
        assert_eq!(apply_all(&on, &[reserve_ports(false)]), doc);
    }

    #[test]
    fn test_trial_mode() {
        let doc = "av::config $test -TrialDuration 30\nav::config $test -trial 0\n";
        assert_eq!(
            apply_all(doc, &[trial_mode(true)]),
            "av::config $test -TrialDuration 30\nav::config $test -trial 1\n"
        );
    }

    #[test]
    fn test_license_and_output_dir() {
        let doc = "x -license {a}\nx -OutputDir {b}\n";
        assert_eq!(
            apply_all(doc, &[license("C100_Lic"), output_dir("C:/out")]),
            "x -license {C100_Lic}\nx -OutputDir {C:/out}\n"
        );
    }

    #[test]
    fn test_enable_only_listed_associations() {
        let directives = Associations::Only(vec!["Slot4".into()]).directives();
        assert_eq!(directives.len(), 2);
        assert_eq!(
            apply_all(ASSOCIATIONS, &directives),
            "\
$client configure -clientSubnet {Slot3}\n\
$client configure -client.userBasedAssociations.association(0).enabled {false}\n\
$client configure -clientSubnet {Slot4}\n\
$client configure -client.userBasedAssociations.association(1).enabled {true}\n\
$client configure -client.globalAssociations.association(0).enabled {false}\n"
        );
    }

    #[test]
    fn test_enable_all_associations() {
        let disabled = apply_all(ASSOCIATIONS, &[disable_all_associations()]);
        assert!(!disabled.contains("{true}"));
        assert_eq!(apply_all(&disabled, &Associations::All.directives()), ASSOCIATIONS);
    }

    #[test]
    fn test_subnet_name_is_literal() {
        let doc = ".clientSubnet {Slot.3}\nenabled {false}\n.clientSubnet {Slotx3}\nenabled {false}\n";
        assert_eq!(
            apply_all(doc, &[enable_association("Slot.3")]),
            ".clientSubnet {Slot.3}\nenabled {true}\n.clientSubnet {Slotx3}\nenabled {false}\n"
        );
    }

    #[test]
    fn test_runtime_everywhere() {
        let runtime = Runtime {
            ramp_up: Some(20),
            steady: Some(300),
            ..Default::default()
        };
        let out = apply_all(PROFILES, &runtime.directives());
        let expected = PROFILES
            .replacen("steadyTime {10}", "steadyTime {20}", 2)
            .replace("steadyTime {60}", "steadyTime {300}");
        assert_eq!(out, expected);
    }

    #[test]
    fn test_runtime_scoped_to_profile() {
        let runtime = Runtime {
            ramp_up: Some(20),
            profiles: vec!["Ftp".into()],
            ..Default::default()
        };
        let out = apply_all(PROFILES, &runtime.directives());

        let (web_before, ftp_before) = PROFILES.split_at(PROFILES.find("{Ftp}").unwrap());
        let (web_after, ftp_after) = out.split_at(out.find("{Ftp}").unwrap());
        assert_eq!(web_after, web_before);
        assert_eq!(ftp_after, ftp_before.replace("steadyTime {10}", "steadyTime {20}"));
    }

    fn profile(name: &str) -> String {
        format!("$lp configure -loadProfile {{{}}}\n", name)
    }

    /// A phase with its duration `pad + 1` lines below the label.
    fn phase(n: u32, label: &str, pad: usize, secs: u64) -> String {
        let mut out = format!("$lp configure -phase({}).label {{{}}}\n", n, label);
        for i in 0..pad {
            out.push_str(&format!("  -phase({}).opt{} {{0}}\n", n, i));
        }
        out.push_str(&format!("  -phase({}).steadyTime {{{}}}\n", n, secs));
        out
    }

    fn variants(web: [u64; 3], ftp: [u64; 2]) -> String {
        [
            profile("Web"),
            phase(1, "ramp up", 4, web[0]),
            phase(2, "Soak", 5, web[1]),
            phase(3, "RampDown", 4, web[2]),
            profile("Ftp"),
            phase(1, "SteadyState", 5, ftp[0]),
            phase(2, "Ramp Down", 4, ftp[1]),
        ]
        .concat()
    }

    #[test]
    fn test_runtime_label_variants() {
        let runtime = Runtime {
            ramp_up: Some(20),
            steady: Some(300),
            ramp_down: Some(30),
            ..Default::default()
        };
        assert_eq!(
            apply_all(&variants([10, 60, 10], [60, 10]), &runtime.directives()),
            variants([20, 300, 30], [300, 30])
        );
    }

    #[test]
    fn test_ramp_down_scoped() {
        let runtime = Runtime {
            ramp_down: Some(45),
            profiles: vec!["Web".into()],
            ..Default::default()
        };
        assert_eq!(
            apply_all(&variants([10, 60, 10], [60, 10]), &runtime.directives()),
            variants([10, 60, 45], [60, 10])
        );
    }

    #[test]
    fn test_steady_scoped_skips_identical_label() {
        let doc = |web, ftp| {
            [
                profile("Web"),
                phase(1, "Steady State", 5, web),
                profile("Ftp"),
                phase(1, "Steady State", 5, ftp),
            ]
            .concat()
        };
        let runtime = Runtime {
            steady: Some(300),
            profiles: vec!["Ftp".into()],
            ..Default::default()
        };
        assert_eq!(apply_all(&doc(60, 60), &runtime.directives()), doc(60, 300));
    }

    #[test]
    fn test_runtime_truncated_phase() {
        let doc = split_lines(
            "$lp configure -loadProfile {Web}\n\
             $lp configure -phase(1).label {Ramp Up}\n\
             \x20 -phase(1).type {stair}\n",
        );
        assert_eq!(
            apply_directive(&doc, &ramp_up(20)).unwrap_err(),
            PatchError::Truncated {
                directive: "runtime-ramp-up".into(),
                anchor_line: 2,
                offset: RAMP_DURATION_OFFSET,
            }
        );
    }

    #[test]
    fn test_plan_order() {
        let plan = ConfigPlan {
            reserve_ports: Some(true),
            license: Some("lic".into()),
            trial_mode: Some(false),
            associations: Some(Associations::Only(vec!["a".into(), "b".into()])),
            runtime: Runtime {
                steady: Some(1),
                ramp_down: Some(2),
                ..Default::default()
            },
            ..Default::default()
        };
        let names: Vec<_> = plan.directives().iter().map(|d| d.name().to_owned()).collect();
        assert_eq!(
            names,
            vec![
                "reserve-ports",
                "license",
                "trial-mode",
                "associations-disable-all",
                "associations-enable:a",
                "associations-enable:b",
                "runtime-steady",
                "runtime-ramp-down",
            ]
        );
        assert!(ConfigPlan::default().is_empty());
    }
}
