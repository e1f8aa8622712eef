#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geom;
pub mod structure;
pub mod synth;

use std::collections::BTreeMap;
use std::fmt;

use geom::{OutputMesh, Tolerance};
use serde::{Deserialize, Serialize};
use structure::{Graph, GraphError, Link, Node, NodeId};
use synth::{BlendSource, ReferenceSurface, ResampleOptions, SpatialIndex, SynthError, blend};
use thiserror::Error;
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
#[wasm_bindgen]
pub async fn initialize_parallel(worker_count: Option<u32>) -> Result<(), JsError> {
    let threads = worker_count
        .map(|count| count.max(1) as usize)
        .or_else(|| {
            std::thread::available_parallelism()
                .map(|value| value.get())
                .ok()
        })
        .unwrap_or(1);

    wasm_bindgen_rayon::init_thread_pool(threads)
        .await
        .map_err(|err| JsError::new(&format!("could not start the rayon thread pool: {err}")))
}

/// A node together with the triangulated surface it is resampled against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub node: Node,
    pub surface: OutputMesh,
}

/// Self-contained blend of two described nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendRequest {
    pub a: NodeDescription,
    pub b: NodeDescription,
    pub t: f64,
    /// Derived from the node bounds when absent.
    #[serde(default)]
    pub options: Option<ResampleOptions>,
}

impl BlendRequest {
    pub fn run(&self) -> Result<OutputMesh, EngineError> {
        let index_a = build_index(&self.a.surface)?;
        let index_b = build_index(&self.b.surface)?;
        let options = self
            .options
            .unwrap_or_else(|| ResampleOptions::for_nodes(&self.a.node, &self.b.node));
        let mesh = blend(
            BlendSource::new(&self.a.node, &index_a),
            BlendSource::new(&self.b.node, &index_b),
            self.t,
            &options,
        )?;
        Ok(mesh)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Synth(#[from] SynthError),
    #[error("no reference surface loaded for node {0}")]
    MissingSurface(NodeId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    pub id: usize,
    pub kind: &'static str,
    pub control_count: Vec<usize>,
    pub valence: usize,
    pub adjacent: Vec<usize>,
    pub surface_triangles: usize,
}

#[derive(Debug, Serialize)]
struct NodeInfoResponse {
    nodes: Vec<NodeInfo>,
}

/// Stateless blend entry point: takes a serialized [`BlendRequest`] and
/// returns the serialized [`OutputMesh`].
#[wasm_bindgen]
pub fn blend_nodes(request: JsValue) -> Result<JsValue, JsValue> {
    let request: BlendRequest = serde_wasm_bindgen::from_value(request).map_err(to_js_error)?;
    let mesh = request.run().map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&mesh).map_err(to_js_error)
}

/// Public entry point for consumers.
///
/// Holds a structure graph and one spatial index per loaded node, so repeated
/// blends between the same nodes only pay for resampling.
#[wasm_bindgen]
pub struct Engine {
    initialized: bool,
    graph: Graph,
    indices: BTreeMap<NodeId, SpatialIndex>,
    options: Option<ResampleOptions>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Engine {
        Engine {
            initialized: true,
            graph: Graph::new(),
            indices: BTreeMap::new(),
            options: None,
        }
    }

    #[wasm_bindgen]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Loads a serialized [`NodeDescription`].
    #[wasm_bindgen]
    pub fn load_node(&mut self, description: JsValue) -> Result<(), JsValue> {
        let description: NodeDescription =
            serde_wasm_bindgen::from_value(description).map_err(to_js_error)?;
        self.insert_node(description).map_err(to_js_error)?;
        Ok(())
    }

    /// Adds a serialized [`Link`] between two loaded nodes.
    #[wasm_bindgen]
    pub fn link_nodes(&mut self, link: JsValue) -> Result<(), JsValue> {
        let link: Link = serde_wasm_bindgen::from_value(link).map_err(to_js_error)?;
        self.insert_link(link).map_err(to_js_error)
    }

    /// Sets the resampling options used by every later blend. `undefined`
    /// restores the per-pair defaults.
    #[wasm_bindgen]
    pub fn set_options(&mut self, options: JsValue) -> Result<(), JsValue> {
        let options = if options.is_undefined() || options.is_null() {
            None
        } else {
            Some(serde_wasm_bindgen::from_value(options).map_err(to_js_error)?)
        };
        self.set_resample_options(options);
        Ok(())
    }

    /// Blends two loaded nodes and returns the serialized mesh.
    #[wasm_bindgen]
    pub fn blend(&self, a: usize, b: usize, t: f64) -> Result<JsValue, JsValue> {
        let mesh = self
            .blend_by_id(NodeId::new(a), NodeId::new(b), t)
            .map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&mesh).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_node_info(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&NodeInfoResponse {
            nodes: self.node_info(),
        })
        .map_err(to_js_error)
    }
}

impl Engine {
    /// Builds the node's spatial index and adds the node to the graph.
    pub fn insert_node(&mut self, description: NodeDescription) -> Result<NodeId, EngineError> {
        let index = build_index(&description.surface)?;
        let id = self.graph.add_node(description.node)?;
        self.indices.insert(id, index);
        log::debug!("loaded node {id}");
        Ok(id)
    }

    pub fn set_resample_options(&mut self, options: Option<ResampleOptions>) {
        self.options = options;
    }

    pub fn insert_link(&mut self, link: Link) -> Result<(), EngineError> {
        self.graph.add_link(link)?;
        Ok(())
    }

    pub fn blend_by_id(&self, a: NodeId, b: NodeId, t: f64) -> Result<OutputMesh, EngineError> {
        let source_a = self.source(a)?;
        let source_b = self.source(b)?;
        let options = self
            .options
            .unwrap_or_else(|| ResampleOptions::for_nodes(source_a.node, source_b.node));
        let mesh = blend(source_a, source_b, t, &options)?;

        let diagnostics = mesh.diagnostics(Tolerance::default_geom());
        if !diagnostics.is_valid_solid() {
            log::warn!("blend of {a} and {b} is not a closed solid: {diagnostics}");
        }
        Ok(mesh)
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn node_info(&self) -> Vec<NodeInfo> {
        self.graph
            .nodes()
            .iter()
            .map(|node| NodeInfo {
                id: node.id.0,
                kind: node.kind_name(),
                control_count: node.control_count(),
                valence: self.graph.valence(node.id),
                adjacent: self.graph.adjacent(node.id).into_iter().map(|id| id.0).collect(),
                surface_triangles: self
                    .indices
                    .get(&node.id)
                    .map_or(0, |index| index.surface().triangle_count()),
            })
            .collect()
    }

    fn source(&self, id: NodeId) -> Result<BlendSource<'_>, EngineError> {
        let node = self
            .graph
            .node(id)
            .ok_or(EngineError::Graph(GraphError::UnknownNode(id)))?;
        let index = self.indices.get(&id).ok_or(EngineError::MissingSurface(id))?;
        Ok(BlendSource::new(node, index))
    }
}

fn build_index(mesh: &OutputMesh) -> Result<SpatialIndex, SynthError> {
    SpatialIndex::build(ReferenceSurface::from_mesh(mesh.clone())?)
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}
