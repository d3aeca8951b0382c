//! Build script: bake release metadata into the binary and render a manual page.

use std::{env, fs, io, path::PathBuf};
use time::{OffsetDateTime, format_description::well_known::Iso8601};

const FALLBACK_DATE: &str = "1970-01-01";
const FALLBACK_COMMIT: &str = "library-import";
const FALLBACK_PRODUCT: &str = "Docker";

fn manual_date() -> String {
    let Ok(raw) = env::var("SOURCE_DATE_EPOCH") else {
        return FALLBACK_DATE.into();
    };

    let Some(date) = raw
        .parse::<i64>()
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|moment| moment.format(&Iso8601::DATE).ok())
    else {
        println!(
            "cargo:warning=Invalid SOURCE_DATE_EPOCH '{raw}'; expected integer seconds since \
             the Unix epoch; falling back to {FALLBACK_DATE}"
        );
        return FALLBACK_DATE.into();
    };
    date
}

/// Reads a release variable, treating an empty value as unset.
fn release_var(key: &str, fallback: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

fn man_dir() -> PathBuf {
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown-target".into());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown-profile".into());
    // OUT_DIR is {target}/{profile}/build/{crate}-{hash}/out
    let base = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .and_then(|out| Some(out.parent()?.parent()?.parent()?.parent()?.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("target"));
    base.join(format!("generated-man/{target}/{profile}"))
}

fn write_man_page(data: &[u8], dir: &std::path::Path, page_name: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let destination = dir.join(page_name);
    let tmp = dir.join(format!("{page_name}.tmp"));
    fs::write(&tmp, data)?;
    if destination.exists() {
        fs::remove_file(&destination)?;
    }
    fs::rename(&tmp, &destination)?;
    Ok(destination)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-env-changed=DOCKERD_GIT_COMMIT");
    println!("cargo:rerun-if-env-changed=DOCKERD_PRODUCT_NAME");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    let commit = release_var("DOCKERD_GIT_COMMIT", FALLBACK_COMMIT);
    let product = release_var("DOCKERD_PRODUCT_NAME", FALLBACK_PRODUCT);
    println!("cargo:rustc-env=DOCKERD_GIT_COMMIT={commit}");
    println!("cargo:rustc-env=DOCKERD_PRODUCT_NAME={product}");

    let version = env::var("CARGO_PKG_VERSION")
        .map_err(|_| "CARGO_PKG_VERSION must be set by Cargo; cannot render manual page without it.")?;
    let date = manual_date();
    let man_page = format!(
        ".TH \"DOCKERD\" \"8\" \"{date}\" \"dockerd {version}, build {commit}\" \"{product}\"\n\
.SH NAME\n\
dockerd \\- A self-sufficient runtime for containers.\n\
.SH SYNOPSIS\n\
.B dockerd\n\
[\\fIOPTIONS\\fR]\n\
.SH DESCRIPTION\n\
dockerd is the persistent process that manages containers. The daemon reads\n\
its defaults from /etc/docker/daemon.json, or from the XDG configuration\n\
directory when running under RootlessKit.\n"
    );

    write_man_page(man_page.as_bytes(), &man_dir(), "dockerd.8")?;
    Ok(())
}
