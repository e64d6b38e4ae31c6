//! Layering guardrails to keep the decision logic free of I/O dependencies.
//!
//! `minefield_core` holds the classifier, the log codec and grouping. It must stay dependency-free so offline
//! tooling over old result logs can use it without pulling in the async runtime. This test scans its
//! `Cargo.toml` and fails if anything appears in `[dependencies]`.

#[test]
fn core_crate_has_no_main_dependencies() {
    let manifest = include_str!("../crates/minefield_core/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the `[dependencies]` table.
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }

        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line_no_comment = line.split('#').next().unwrap_or("").trim();
        if !line_no_comment.is_empty() {
            panic!("`minefield_core` must not have [dependencies]; found `{line_no_comment}`");
        }
    }
}

#[test]
fn core_sources_do_not_touch_processes_or_the_filesystem() {
    let sources = [
        include_str!("../crates/minefield_core/src/expectation.rs"),
        include_str!("../crates/minefield_core/src/verdict.rs"),
        include_str!("../crates/minefield_core/src/record.rs"),
        include_str!("../crates/minefield_core/src/grouping.rs"),
    ];
    for source in sources {
        for forbidden in ["std::fs", "std::process", "std::net", "std::thread"] {
            assert!(!source.contains(forbidden), "`{forbidden}` used in minefield_core");
        }
    }
}
