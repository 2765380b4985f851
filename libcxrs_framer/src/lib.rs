//! # cxrs_framer
//!
//! cxrs_framer builds a machine-learning ready dataset out of the charge exchange
//! recombination spectroscopy (CXRS) diagnostics of a tokamak, one shot at a time. For
//! every shot in a range it loads the fitted radial profiles and the raw spectrometer
//! volumes, resamples them onto one shared time base, subsamples the volumes along
//! time, merges everything into a single labeled dataset and appends it to an on-disk
//! store indexed by shot.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### HDF5
//!
//! Both the signal archive and the output store use HDF5, so HDF5 must be installed.
//! Typically this will be installed using a package manager (homebrew, apt, etc), and the
//! Rust libraries will auto detect the location of the HDF install. If a custom install is
//! needed, write the following snippet into the file `.cargo/config.toml`:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./cxrs_framer_cli` from the top
//! level repository.
//!
//! ## Configuration
//!
//! All options of a batch live in a YAML file which the CLI can generate with
//! `cxrs_framer_cli new config.yml`. Command line options override the file.
//!
//! ```yml
//! output_path: .
//! source_path: None
//! first_shot: 0
//! last_shot: 0
//! sample_method: grid
//! num_samples: 10
//! seed: 42
//! overwrite: false
//! time_base:
//!   min_time: -0.1
//!   max_time: 2.0
//!   dt: 0.005
//! wavelength_signal: /act/cel3/ss/wavelength
//! profiles:
//! - name: fit_ratio
//!   signal: ACT/CEL3/SS/PVB/FIT_RATIO
//! volumes:
//! - name: ss_counts
//!   signal: ACT/CEL3/SS/COUNTS
//! ```
//!
//! ## Output
//!
//! A batch writes the store `shots.cxrs` in the output directory and a log file. Shots
//! which fail are logged and skipped, so the log file should always be checked. The
//! layout of the store is described in the [store] module.
pub mod aligner;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod hdf_source;
pub mod loader;
pub mod merger;
pub mod process;
pub mod sampler;
pub mod shot_status;
pub mod signal;
pub mod store;
