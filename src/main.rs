use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use lightmap_combiner::host::{Host, SceneHost, SceneQuery};
use lightmap_combiner::scene_graph::{ObjectId, Scene};
use lightmap_combiner::{join_children_with_lightmap, JoinOptions};

/// Join every mesh under a root node into one object and generate a packed
/// LightmapUV layer for it.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// glTF or GLB file to load.
    scene: PathBuf,

    /// Name of the root object. Defaults to the first root of the scene.
    #[arg(long)]
    root: Option<String>,

    /// Lightmap atlas size in pixels.
    #[arg(long, default_value_t = 4096)]
    atlas_size: u32,

    /// Padding between islands in atlas pixels.
    #[arg(long, default_value_t = 14)]
    margin: u32,

    /// Skip the lightmap packer and use smart projection directly.
    #[arg(long)]
    no_lightmap_pack: bool,

    /// Keep only meshes bound to the most common armature instead of aborting.
    #[arg(long)]
    allow_mixed_armatures: bool,

    /// Join a copy of the hierarchy and keep the originals.
    #[arg(long)]
    duplicate_first: bool,

    /// Delete the original hierarchy after joining.
    #[arg(long)]
    delete_original: bool,

    /// Print the resulting hierarchy.
    #[arg(long)]
    tree: bool,
}

impl Args {
    fn join_options(&self) -> JoinOptions {
        JoinOptions {
            atlas_size: self.atlas_size,
            margin_px: self.margin,
            use_lightmap_pack: !self.no_lightmap_pack,
            require_same_armature: !self.allow_mixed_armatures,
            duplicate_first: self.duplicate_first,
            delete_original_subtree: self.delete_original,
        }
    }
}

fn find_root(scene: &Scene, name: Option<&str>) -> Result<ObjectId> {
    match name {
        Some(name) => scene
            .get_object_by_name(name)
            .ok_or_else(|| anyhow!("No object named '{}'", name)),
        None => scene
            .root_objects()
            .first()
            .copied()
            .ok_or_else(|| anyhow!("Scene has no objects")),
    }
}

fn print_tree<Q: SceneQuery>(scene: &Q, id: ObjectId, depth: usize) {
    let Some(name) = scene.name(id) else {
        return;
    };
    let kind = scene.kind(id).map(|kind| kind.to_string()).unwrap_or_default();
    let uv_layers = scene
        .mesh_data(id)
        .map(|mesh| {
            let names = mesh
                .uv_layers()
                .iter()
                .map(|layer| layer.name.as_str())
                .collect::<Vec<_>>();
            format!(" [{} faces; UV: {}]", mesh.num_faces(), names.join(", "))
        })
        .unwrap_or_default();

    println!("{}{} ({}){}", "  ".repeat(depth), name, kind, uv_layers);
    for &child in scene.children(id) {
        print_tree(scene, child, depth + 1);
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = Args::parse();

    let scene = Scene::load_gltf(&args.scene)
        .with_context(|| format!("Failed to load {}", args.scene.display()))?;
    let root = find_root(&scene, args.root.as_deref())?;

    let mut host = SceneHost::new(scene);
    host.set_active(Some(root));

    let report = join_children_with_lightmap(&mut host, &args.join_options())
        .context("Join children + lightmap UV aborted")?;
    println!("{}", report);

    if args.tree {
        for root in host.scene.root_objects() {
            print_tree(&host.scene, root, 0);
        }
    }

    Ok(())
}
