use serde::Deserialize;
use simple_error::SimpleError;
use std::collections::HashMap;
use std::error::Error;
use std::fs::read_to_string;
use std::path::Path;
use std::process::Command;
use which::which_in;

/// Describes how to launch the vendor tools of one installation.
///
/// Loaded from a TOML file such as:
///
/// ```toml
/// use_wine = false
/// [env]
/// PATH = "/opt/Xilinx/Vivado/2020.2/bin:/usr/bin:/bin"
/// XILINXD_LICENSE_FILE = "2100@license-server"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Toolchain {
    #[serde(default)]
    pub use_wine: bool,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Toolchain {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let s = read_to_string(path)?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(s)?)
    }

    /// Builds a command for `cmd`, resolved against the toolchain `PATH` when one is set.
    pub fn command(&self, cmd: &str) -> Result<Command, Box<dyn Error>> {
        let mut res = if self.use_wine {
            let mut res = Command::new("wine");
            res.arg(cmd);
            res
        } else if let Some(path) = self.env.get("PATH") {
            let rcmd = which_in(cmd, Some(path), "/").map_err(|e| {
                SimpleError::new(format!("cannot find {cmd} in toolchain PATH: {e}"))
            })?;
            Command::new(rcmd)
        } else {
            Command::new(cmd)
        };
        for (k, v) in self.env.iter() {
            res.env(k, v);
        }
        Ok(res)
    }

    /// Command line for a Vivado batch run of `script.tcl`.
    pub fn vivado_batch_args<'a>(tclargs: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec![
            "-nolog",
            "-nojournal",
            "-mode",
            "batch",
            "-source",
            "script.tcl",
        ];
        if !tclargs.is_empty() {
            args.push("-tclargs");
            args.extend_from_slice(tclargs);
        }
        args
    }
}
