// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! Build-time metadata embedded into the `boson-node` binary and stamped onto
//! outgoing wire messages as the `v` version tag.

/// The crate version declared in `Cargo.toml`, e.g. `"0.1.0"`.
pub const PACKAGE_VERSION: &str = env!("BOSON_PKG_VERSION");

/// Git information separated by slashes: `<sha> / <branch> / <describe>`
pub const fn git_info() -> &'static str {
    concat!(
        env!("VERGEN_GIT_SHA"),
        " / ",
        env!("VERGEN_GIT_BRANCH"),
        " / ",
        env!("VERGEN_GIT_DESCRIBE"),
        " / ",
        env!("VERGEN_BUILD_DATE")
    )
}

/// Annotated tag description, or fall back to abbreviated commit object.
pub const fn git_describe() -> &'static str {
    env!("VERGEN_GIT_DESCRIBE")
}

/// The current git branch.
pub const fn git_branch() -> &'static str {
    env!("VERGEN_GIT_BRANCH")
}

/// Shortened SHA-1 hash.
pub const fn git_sha() -> &'static str {
    env!("VERGEN_GIT_SHA")
}

/// A short human-readable string combining package version and commit, suitable
/// for logging at node startup and for populating the wire envelope's `v` tag.
pub fn version_string() -> String {
    format!("{PACKAGE_VERSION}+{}", git_sha())
}
