//! Scene Probe
//!
//! Loads a scene document headlessly, pumping the asset server once per
//! frame until the tree reports loaded, then prints the resulting tree.
//!
//! Run with: cargo run --bin scene-probe -- scenes/map.json
//!       or: cargo run --bin scene-probe -- --config scene.toml --caching scenes/map.json
//!
//! Exit code is 0 when the scene loaded, 1 when it stalled, 2 on bad input.

use std::cell::Cell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use futures::executor::LocalPool;
use void_asset::{AssetEvent, AssetManifest, AssetServer};
use void_scene::{Component, Loadable, SceneConfig, SceneEnv, SceneNode, SceneTree, TypeRegistry};

#[derive(Parser, Debug)]
#[command(name = "scene-probe")]
#[command(about = "Load a scene document headlessly and report its load state")]
struct Args {
    /// Scene document (JSON Node Data)
    scene: PathBuf,

    /// Config file, overriding VOID_SCENE_CONFIG and ./scene.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ask the asset provider to keep fetched assets resident
    #[arg(long)]
    caching: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match SceneConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(2);
        }
    };
    let caching = args.caching || config.scene.caching;

    let server = Rc::new(AssetServer::new(config.asset_server_config()));
    if let Some(manifest) = &config.assets.manifest {
        match AssetManifest::from_file(manifest) {
            Ok(manifest) => {
                log::info!("Declared {} assets", manifest.len());
                server.add_manifest(manifest);
            }
            Err(e) => {
                log::error!("Failed to read manifest {}: {}", manifest, e);
                return ExitCode::from(2);
            }
        }
    }

    let mut pool = LocalPool::new();
    let env = SceneEnv::new(server.clone()).with_spawner(pool.spawner());
    let options = config.tree_options();

    let tree = match SceneTree::from_file(&args.scene, caching, Rc::new(TypeRegistry::new()), env, options) {
        Ok(tree) => tree,
        Err(e) => {
            log::error!("{}: {}", args.scene.display(), e);
            return ExitCode::from(2);
        }
    };

    let loaded = Rc::new(Cell::new(false));
    {
        let loaded = Rc::clone(&loaded);
        tree.on_loaded(move || loaded.set(true));
    }
    tree.on_progress(|p| log::info!("Progress: {:.0}%", p * 100.0));

    if !options.auto_load && !tree.spawn_load() {
        return ExitCode::from(2);
    }

    let frames = run_frames(&mut pool, &server, &loaded, config.scene.max_frames);
    print_tree(tree.root(), 0);

    if tree.is_loaded() {
        log::info!("Scene loaded after {} frames", frames);
        ExitCode::SUCCESS
    } else {
        log::warn!("Scene did not finish loading after {} frames", frames);
        ExitCode::from(1)
    }
}

/// Pump the executor and the asset server until loaded, stalled, or out of frames
fn run_frames(pool: &mut LocalPool, server: &AssetServer, loaded: &Cell<bool>, max_frames: u32) -> u32 {
    let mut frame = 0;
    loop {
        pool.run_until_stalled();
        if loaded.get() {
            return frame;
        }
        if max_frames != 0 && frame >= max_frames {
            return frame;
        }

        let completed = server.process_from_disk();
        for event in server.drain_events() {
            match event {
                AssetEvent::Loaded { key, id } => log::debug!("Asset '{}' resident as {:?}", key, id),
                AssetEvent::Failed { key, error } => log::warn!("Asset '{}' failed: {}", key, error),
            }
        }

        frame += 1;
        if completed == 0 && server.pending_count() == 0 {
            pool.run_until_stalled();
            return frame;
        }
    }
}

fn print_tree(node: &Rc<dyn SceneNode>, depth: usize) {
    let loader = node.node();
    let components = loader.components();
    let kinds: Vec<&str> = components.iter().map(Component::kind).collect();
    println!(
        "{:indent$}{} [{:?}] {}",
        "",
        loader.name(),
        loader.state(),
        kinds.join(", "),
        indent = depth * 2
    );
    for child in loader.children() {
        print_tree(&child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_with_flags() {
        let args = Args::try_parse_from(["scene-probe", "--config", "scene.toml", "--caching", "map.json"]).unwrap();
        assert_eq!(args.scene, PathBuf::from("map.json"));
        assert_eq!(args.config, Some(PathBuf::from("scene.toml")));
        assert!(args.caching);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["scene-probe", "map.json"]).unwrap();
        assert_eq!(args.scene, PathBuf::from("map.json"));
        assert!(args.config.is_none());
        assert!(!args.caching);
    }

    #[test]
    fn test_args_rejected() {
        assert!(Args::try_parse_from(["scene-probe"]).is_err());
        assert!(Args::try_parse_from(["scene-probe", "--frames", "3", "map.json"]).is_err());
        assert!(Args::try_parse_from(["scene-probe", "--config"]).is_err());
        assert!(Args::try_parse_from(["scene-probe", "a.json", "b.json"]).is_err());
    }
}
