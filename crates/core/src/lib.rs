pub mod article;
pub mod dom_tree;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod parse;
pub mod policy;
pub mod postprocess;
pub mod preprocess;
pub mod readability;
#[cfg(feature = "fetch")]
pub mod render;
pub mod scoring;
#[cfg(feature = "structured")]
pub mod structured;

pub use article::{Article, OutputFormat};
#[doc(hidden)]
pub use dom_tree::{DomNode, DomTree, NodeId, build_dom_tree};
pub use error::{DeclutterError, Result};
pub use extract::{Selection, SelectionSource, cleanup_selection, select};
pub use fetch::{FetchConfig, FetchProfile, TlsPolicy};
pub use fetch::{fetch_file, fetch_stdin, fetch_url, validate_markup, validate_url};
pub use parse::Document;
pub use policy::{ExtractionPolicy, FilterPolicy, KeywordSet, ScorePolicy};
pub use postprocess::{NormalizeReport, normalize};
pub use preprocess::{FilterReport, filter, preprocess_html};
pub use readability::{
    Declutter, DeclutterConfig, DeclutterConfigBuilder, Extraction, ExtractionMode, PipelineReport, fetch_and_parse,
    parse, parse_with_url,
};
#[cfg(feature = "fetch")]
pub use render::{BrowserError, BrowserLauncher, BrowserSession, RenderedPage, WaitCondition, render_page};
#[doc(hidden)]
pub use scoring::{ScoreResult, WeightTable, calculate_score, link_density};
