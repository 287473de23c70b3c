use crate::toolchain::Toolchain;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::error::Error;
use std::fs::{File, write};
use std::io::{self, BufReader, Read};
use std::process::{Child, Stdio};
use tempfile::TempDir;
use tracing::debug;

/// Streams the output a tool writes into a named pipe.
///
/// The tool is started in a scratch directory populated with `input_files`;
/// it is expected to open `fifo_name` for writing.  The child is reaped when
/// the reader is dropped.
pub struct ToolchainReader {
    _dir: TempDir,
    fifo: Option<File>,
    child: Child,
}

impl ToolchainReader {
    pub fn new(
        tc: &Toolchain,
        cmd: &str,
        args: &[&str],
        env: &[(&str, &str)],
        fifo_name: &str,
        input_files: &[(&str, &[u8])],
    ) -> Result<BufReader<Self>, Box<dyn Error>> {
        let dir = TempDir::new()?;
        for (k, v) in input_files {
            write(dir.path().join(k), v)?;
        }
        let path = dir.path().join(fifo_name);
        mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR)?;
        let mut command = tc.command(cmd)?;
        command.current_dir(dir.path().as_os_str());
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
        command.args(args);
        for (k, v) in env {
            command.env(k, v);
        }
        debug!("starting {cmd} {args:?} in {dir}", dir = dir.path().display());
        let child = command.spawn()?;
        let fifo = File::open(path)?;
        Ok(BufReader::with_capacity(
            1 << 20,
            ToolchainReader {
                fifo: Some(fifo),
                _dir: dir,
                child,
            },
        ))
    }
}

impl Read for ToolchainReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.fifo {
            Some(fifo) => fifo.read(buf),
            None => Ok(0),
        }
    }
}

impl Drop for ToolchainReader {
    fn drop(&mut self) {
        self.fifo = None;
        // Nothing much to do if it fails.
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;

    #[test]
    fn stream_from_fifo() {
        let tc = Toolchain::default();
        let script = b"{ echo \"TILE $1\"; echo END; } > out.fifo\n";
        let reader = ToolchainReader::new(
            &tc,
            "sh",
            &["script.sh", "INT_L_X2Y0"],
            &[],
            "out.fifo",
            &[("script.sh", &script[..])],
        )
        .unwrap();
        let lines: Vec<_> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, ["TILE INT_L_X2Y0", "END"]);
    }
}
