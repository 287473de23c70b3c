mod toolchain;
mod toolreader;

pub use toolchain::Toolchain;
pub use toolreader::ToolchainReader;
