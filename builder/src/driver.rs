// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The build graph itself: which files are produced from which, and with
//! what tools. Phases launch their commands asynchronously and drain the
//! process batch once per phase, so work within a phase overlaps but no
//! phase starts before the previous one has been fully checked.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use host_abstraction_layer::{FileKind, Host};
use tracing::{debug, info};

use crate::{
    arena::ScratchArena,
    batch::ProcessBatch,
    command::CommandLine,
    fsops::{self, Freshness},
    text,
};

const COMMON_CFLAGS: [&str; 6] = ["-std=c99", "-Wextra", "-Wall", "-Wpedantic", "-Werror", "-Wshadow"];
const DEBUG_CFLAGS: [&str; 4] = ["-O0", "-D_DEBUG", "-g", "-fno-omit-frame-pointer"];
const RELEASE_CFLAGS: [&str; 4] = ["-O3", "-flto", "-D_NDEBUG", "-s"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Debug,
    Release,
}

impl BuildMode {
    /// The per-mode subdirectory of the output directory.
    pub fn subdir(self) -> &'static str {
        match self {
            BuildMode::Debug => "debug",
            BuildMode::Release => "release",
        }
    }
}

/// Where the driver finds sources and resources and puts build outputs.
/// Mainly exists so tests can aim the driver at a scratch tree.
pub struct BuildLayout {
    pub src_dir: PathBuf,
    pub res_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl Default for BuildLayout {
    fn default() -> BuildLayout {
        BuildLayout {
            src_dir: PathBuf::from("src"),
            res_dir: PathBuf::from("res"),
            out_dir: PathBuf::from("out"),
        }
    }
}

/// The shared state every phase works with: the host, one reusable command
/// being built up, the batch of in-flight children, and the scratch arena
/// transient paths are formatted into.
pub struct BuildContext<'host> {
    pub host: &'host dyn Host,
    pub cmd: CommandLine,
    pub procs: ProcessBatch,
    pub arena: ScratchArena,
}

impl<'host> BuildContext<'host> {
    pub fn new(host: &'host dyn Host) -> BuildContext<'host> {
        BuildContext {
            host,
            cmd: CommandLine::new(),
            procs: ProcessBatch::new(),
            arena: ScratchArena::default(),
        }
    }
}

/// Runs the whole build: shaders first, then the engine binary. Each phase
/// only launches work whose outputs are missing or older than their inputs,
/// so a second run right after a successful one launches nothing.
pub fn run_build(ctx: &mut BuildContext, layout: &BuildLayout, mode: BuildMode) -> Result<()> {
    fsops::mkdir_if_not_exists(ctx.host, &layout.out_dir)?;
    compile_shaders(ctx, layout)?;
    link_engine(ctx, layout, mode)?;
    Ok(())
}

/// Compiles every `.slang` file under `res/shaders/` into SPIR-V in
/// `out/shader_cache/`, skipping shaders whose cached output is already up
/// to date.
fn compile_shaders(ctx: &mut BuildContext, layout: &BuildLayout) -> Result<()> {
    let shader_dir = layout.res_dir.join("shaders");
    let cache_dir = layout.out_dir.join("shader_cache");

    let entries = ctx
        .host
        .read_dir(&shader_dir)
        .with_context(|| format!("could not enumerate shaders in `{}`", shader_dir.display()))?;
    fsops::mkdir_if_not_exists(ctx.host, &cache_dir)?;

    for name in &entries {
        if !name.ends_with(".slang") {
            debug!("skipping non-shader file {name}");
            continue;
        }

        let checkpoint = ctx.arena.save();
        let mut rest = name.as_str();
        let stem = text::chop_by_delimiter(&mut rest, '.');
        let src = ctx
            .arena
            .format(format_args!("{}/{}", shader_dir.display(), name));
        let dst = ctx
            .arena
            .format(format_args!("{}/{}.spv", cache_dir.display(), stem));

        let src_kind = ctx
            .host
            .file_kind(Path::new(src))
            .with_context(|| format!("could not determine type of `{src}`"))?;
        if src_kind != FileKind::Regular {
            debug!("skipping {src}, not a regular file");
        } else if fsops::needs_rebuild1(ctx.host, Path::new(dst), Path::new(src))? == Freshness::Stale {
            ctx.cmd
                .arg("slangc")
                .arg(src)
                .args(["-target", "spirv", "-o"])
                .arg(dst);
            let handle = ctx.cmd.run_async(ctx.host)?;
            ctx.procs.push(handle);
        } else {
            debug!("{dst} is up to date");
        }
        ctx.arena.rewind(checkpoint);
    }

    ctx.procs
        .wait_all_and_reset(ctx.host)
        .context("shader compilation failed")
}

/// Compiles and links the engine binary out of `src/main.c`, against Vulkan
/// from the SDK named by `VULKAN_SDK` and the GLFW shipped in `ext/`.
fn link_engine(ctx: &mut BuildContext, layout: &BuildLayout, mode: BuildMode) -> Result<()> {
    let mode_dir = layout.out_dir.join(mode.subdir());
    fsops::mkdir_if_not_exists(ctx.host, &mode_dir)?;

    let engine_path = mode_dir.join(if cfg!(windows) { "engine.exe" } else { "engine" });
    let main_c = layout.src_dir.join("main.c");
    if fsops::needs_rebuild1(ctx.host, &engine_path, &main_c)? == Freshness::UpToDate {
        info!("{} is up to date", engine_path.display());
        return Ok(());
    }

    let vulkan_sdk = ctx
        .host
        .env_var("VULKAN_SDK")
        .ok_or_else(|| anyhow!("VULKAN_SDK is not set, install the Vulkan SDK and point VULKAN_SDK at it"))?;
    let vulkan_sdk = vulkan_sdk
        .into_string()
        .map_err(|_| anyhow!("VULKAN_SDK is not valid Unicode"))?;

    let checkpoint = ctx.arena.save();
    ctx.cmd.arg("gcc").args(COMMON_CFLAGS);
    match mode {
        BuildMode::Debug => {
            ctx.cmd.args(DEBUG_CFLAGS);
            // The sanitizer runtimes are not a given on a MinGW toolchain.
            if !cfg!(windows) {
                ctx.cmd.arg("-fsanitize=address,leak,undefined");
            }
        }
        BuildMode::Release => {
            ctx.cmd.args(RELEASE_CFLAGS);
        }
    }
    ctx.cmd.arg("-o").arg(&engine_path);
    ctx.cmd.arg("-Iext/include");
    ctx.cmd
        .arg(ctx.arena.format(format_args!("-I{vulkan_sdk}/Include")));
    ctx.cmd.arg(&main_c);
    ctx.cmd
        .arg(ctx.arena.format(format_args!("-L{vulkan_sdk}/Lib")));
    ctx.cmd
        .arg(if cfg!(windows) { "-lvulkan-1" } else { "-lvulkan" });
    ctx.cmd.args(["-Lext/lib/GLFW", "-lglfw3"]);

    let handle = ctx.cmd.run_async(ctx.host)?;
    ctx.procs.push(handle);
    let waited = ctx.procs.wait_all_and_reset(ctx.host);
    ctx.arena.rewind(checkpoint);
    waited.context("linking the engine failed")
}

#[cfg(test)]
mod tests {
    use super::{run_build, BuildContext, BuildLayout, BuildMode};
    use crate::test_host::{PlannedExit, TestHost};

    fn engine_path() -> &'static str {
        if cfg!(windows) {
            "out/debug/engine.exe"
        } else {
            "out/debug/engine"
        }
    }

    fn populated_host() -> TestHost {
        let host = TestHost::new();
        host.add_dir("res");
        host.add_dir("res/shaders");
        host.add_file("res/shaders/a.slang", 100);
        host.add_file("res/shaders/b.slang", 100);
        host.add_file("res/shaders/notes.txt", 100);
        host.add_dir("src");
        host.add_file("src/main.c", 100);
        host.set_env("VULKAN_SDK", "/opt/vulkan");
        host
    }

    #[test]
    fn a_cold_build_compiles_both_shaders_and_links_once() {
        let host = populated_host();
        host.plan_process(PlannedExit::exit(0).creates("out/shader_cache/a.spv", 150));
        host.plan_process(PlannedExit::exit(0).creates("out/shader_cache/b.spv", 150));
        host.plan_process(PlannedExit::exit(0).creates(engine_path(), 150));

        let mut ctx = BuildContext::new(&host);
        run_build(&mut ctx, &BuildLayout::default(), BuildMode::Debug).unwrap();

        let spawned = host.spawned_commands();
        assert_eq!(spawned.len(), 3);
        assert_eq!(
            spawned[0],
            "slangc res/shaders/a.slang -target spirv -o out/shader_cache/a.spv"
        );
        assert_eq!(
            spawned[1],
            "slangc res/shaders/b.slang -target spirv -o out/shader_cache/b.spv"
        );
        assert!(spawned[2].starts_with("gcc -std=c99 -Wextra"));
        assert!(spawned[2].contains("-I/opt/vulkan/Include"));
        assert!(spawned[2].contains("src/main.c"));
        assert!(spawned[2].contains("-lglfw3"));
        assert_eq!(host.running_count(), 0);
        // All the transient path strings were released again.
        assert_eq!(ctx.arena.allocated(), 0);
    }

    #[test]
    fn a_second_run_launches_nothing() {
        let host = populated_host();
        host.plan_process(PlannedExit::exit(0).creates("out/shader_cache/a.spv", 150));
        host.plan_process(PlannedExit::exit(0).creates("out/shader_cache/b.spv", 150));
        host.plan_process(PlannedExit::exit(0).creates(engine_path(), 150));

        let mut ctx = BuildContext::new(&host);
        run_build(&mut ctx, &BuildLayout::default(), BuildMode::Debug).unwrap();
        run_build(&mut ctx, &BuildLayout::default(), BuildMode::Debug).unwrap();

        assert_eq!(host.spawned_commands().len(), 3);
    }

    #[test]
    fn a_directory_with_a_shader_suffix_is_not_compiled() {
        let host = populated_host();
        host.add_dir("res/shaders/old.slang");
        host.plan_process(PlannedExit::exit(0).creates("out/shader_cache/a.spv", 150));
        host.plan_process(PlannedExit::exit(0).creates("out/shader_cache/b.spv", 150));
        host.plan_process(PlannedExit::exit(0).creates(engine_path(), 150));

        let mut ctx = BuildContext::new(&host);
        run_build(&mut ctx, &BuildLayout::default(), BuildMode::Debug).unwrap();

        let spawned = host.spawned_commands();
        assert_eq!(spawned.len(), 3);
        assert!(!spawned.iter().any(|cmd| cmd.contains("old.slang")));
    }

    #[test]
    fn one_stale_shader_is_recompiled_alone() {
        let host = populated_host();
        host.add_dir("out");
        host.add_dir("out/shader_cache");
        host.add_file("out/shader_cache/a.spv", 150);
        // b.spv is older than its source.
        host.add_file("out/shader_cache/b.spv", 50);
        host.add_dir("out/debug");
        host.add_file(engine_path(), 150);

        let mut ctx = BuildContext::new(&host);
        run_build(&mut ctx, &BuildLayout::default(), BuildMode::Debug).unwrap();

        let spawned = host.spawned_commands();
        assert_eq!(spawned.len(), 1);
        assert!(spawned[0].starts_with("slangc res/shaders/b.slang"));
    }

    #[test]
    fn a_failed_shader_compile_fails_the_run_before_linking() {
        let host = populated_host();
        host.plan_process(PlannedExit::exit(0).creates("out/shader_cache/a.spv", 150));
        host.plan_process(PlannedExit::exit(1));

        let mut ctx = BuildContext::new(&host);
        let result = run_build(&mut ctx, &BuildLayout::default(), BuildMode::Debug);
        assert!(result.is_err());
        // Both shader children were reaped, and the linker never ran.
        assert_eq!(host.spawned_commands().len(), 2);
        assert_eq!(host.running_count(), 0);
    }

    #[test]
    fn release_mode_links_into_its_own_directory() {
        let host = populated_host();
        host.add_dir("out");
        host.add_dir("out/shader_cache");
        host.add_file("out/shader_cache/a.spv", 150);
        host.add_file("out/shader_cache/b.spv", 150);

        let mut ctx = BuildContext::new(&host);
        run_build(&mut ctx, &BuildLayout::default(), BuildMode::Release).unwrap();

        let spawned = host.spawned_commands();
        assert_eq!(spawned.len(), 1);
        assert!(spawned[0].contains("-O3"));
        assert!(spawned[0].contains("out/release/"));
        assert!(!spawned[0].contains("-fsanitize"));
    }

    #[test]
    fn a_missing_vulkan_sdk_is_a_diagnosed_error() {
        let host = TestHost::new();
        host.add_dir("res");
        host.add_dir("res/shaders");
        host.add_file("res/shaders/a.slang", 100);
        host.add_file("res/shaders/b.slang", 100);
        host.add_dir("src");
        host.add_file("src/main.c", 100);
        host.add_dir("out");
        host.add_dir("out/shader_cache");
        host.add_file("out/shader_cache/a.spv", 150);
        host.add_file("out/shader_cache/b.spv", 150);

        let mut ctx = BuildContext::new(&host);
        let err = run_build(&mut ctx, &BuildLayout::default(), BuildMode::Debug).unwrap_err();
        assert!(format!("{err:#}").contains("VULKAN_SDK"));
        assert_eq!(host.spawned_commands().len(), 0);
    }

    #[test]
    fn a_missing_shader_directory_is_an_error() {
        let host = TestHost::new();
        host.add_dir("src");
        host.add_file("src/main.c", 100);
        host.set_env("VULKAN_SDK", "/opt/vulkan");

        let mut ctx = BuildContext::new(&host);
        assert!(run_build(&mut ctx, &BuildLayout::default(), BuildMode::Debug).is_err());
    }
}
