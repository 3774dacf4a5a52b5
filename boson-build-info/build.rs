// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    EmitBuilder::builder()
        .build_date()
        // Emit the short SHA-1 hash of the current commit
        .git_sha(true)
        // Emit the current branch name
        .git_branch()
        // Emit the annotated tag of the current commit, or fall back to abbreviated commit object.
        .git_describe(true, false, None)
        .emit()?;

    println!("cargo:rustc-env=BOSON_PKG_VERSION={}", env!("CARGO_PKG_VERSION"));

    Ok(())
}
