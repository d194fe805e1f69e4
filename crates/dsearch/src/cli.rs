use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::find_molecules::MoleculeSearch;
use crate::commands::mols_in_patents::PatentSource;
use crate::commands::{self, Output};
use crate::config::DisplayMode;
use crate::context::CommandContext;
use crate::error::Result;
use crate::query::{SearchRequest, ShowMode};

#[derive(Parser, Debug)]
#[command(name = "ds", version)]
#[command(about = "Deep Search commands - search collections, documents, molecules and patents")]
pub struct Cli {
  /// Output target: styled terminal tables, notebook HTML, or JSON on stdout
  #[arg(long, global = true, value_enum, env = "DS_DISPLAY")]
  pub display: Option<DisplayMode>,

  /// Directory holding credentials and settings (default ~/.openad)
  #[arg(long, global = true, env = "DS_HOME")]
  pub home: Option<PathBuf>,

  /// Directory that saved results are written to (default current directory)
  #[arg(long, global = true, env = "DS_WORKSPACE")]
  pub workspace: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
  /// Log in to Deep Search, or reset stored credentials
  Login {
    #[arg(long)]
    reset: bool,
  },
  /// List every collection
  ListCollections {
    #[arg(long)]
    save_as: Option<String>,
  },
  /// List the distinct domains collections belong to
  Domains {
    #[arg(long)]
    save_as: Option<String>,
  },
  /// List collections belonging to any of the given domains
  CollectionsForDomain {
    #[arg(required = true)]
    domains: Vec<String>,
    #[arg(long)]
    save_as: Option<String>,
  },
  /// Count matches for a query in every collection
  CollectionsContaining {
    query: String,
    #[arg(long)]
    save_as: Option<String>,
  },
  /// Show the details of one collection
  CollectionDetails {
    /// Collection name or key
    collection: String,
  },
  /// Search a collection
  SearchCollection {
    /// Collection name or key
    collection: String,
    query: String,
    /// Search parameters as name=value, e.g. elastic_page_size=20
    #[arg(long = "using", value_name = "NAME=VALUE")]
    using: Vec<String>,
    /// Field groups to retrieve; repeat for both
    #[arg(long, value_enum)]
    show: Vec<ShowMode>,
    /// Only report the estimated result count
    #[arg(long)]
    estimate_only: bool,
    /// Return the rows as JSON instead of displaying them
    #[arg(long)]
    return_as_data: bool,
    #[arg(long)]
    save_as: Option<String>,
  },
  /// Find molecules similar to a SMILES string
  Similar {
    smiles: String,
    #[arg(long)]
    save_as: Option<String>,
  },
  /// Find molecules containing a SMILES substructure
  Substructure {
    smiles: String,
    #[arg(long)]
    save_as: Option<String>,
  },
  /// Find patents mentioning a molecule
  PatentsContaining {
    smiles: String,
    #[arg(long)]
    save_as: Option<String>,
  },
  /// Find molecules mentioned in patents
  #[command(group(ArgGroup::new("patents").required(true).args(["list", "file"])))]
  MolsInPatents {
    /// Patent ids
    #[arg(long, num_args = 1..)]
    list: Vec<String>,
    /// CSV file in the workspace with a patent id column
    #[arg(long)]
    file: Option<String>,
    #[arg(long)]
    save_as: Option<String>,
  },
}

/// Run one parsed command against a context
pub async fn execute(ctx: &mut CommandContext, command: Commands) -> Result<Output> {
  match command {
    Commands::Login { reset } => commands::login::handle(ctx, reset).await,
    Commands::ListCollections { save_as } => {
      commands::list_collections::handle(ctx, save_as.as_deref()).await
    }
    Commands::Domains { save_as } => commands::domains::handle(ctx, save_as.as_deref()).await,
    Commands::CollectionsForDomain { domains, save_as } => {
      commands::collections_for_domain::handle(ctx, &domains, save_as.as_deref()).await
    }
    Commands::CollectionsContaining { query, save_as } => {
      commands::collections_containing::handle(ctx, &query, save_as.as_deref()).await
    }
    Commands::CollectionDetails { collection } => {
      commands::collection_details::handle(ctx, &collection).await
    }
    Commands::SearchCollection {
      collection,
      query,
      using,
      show,
      estimate_only,
      return_as_data,
      save_as,
    } => {
      let request = SearchRequest {
        collection: Some(collection),
        query,
        using,
        show,
        estimate_only,
        return_as_data,
        save_as,
      };
      commands::search_collection::handle(ctx, &request).await
    }
    Commands::Similar { smiles, save_as } => {
      let search = MoleculeSearch::Similar;
      commands::find_molecules::handle(ctx, search, &smiles, save_as.as_deref()).await
    }
    Commands::Substructure { smiles, save_as } => {
      let search = MoleculeSearch::Substructure;
      commands::find_molecules::handle(ctx, search, &smiles, save_as.as_deref()).await
    }
    Commands::PatentsContaining { smiles, save_as } => {
      commands::patents_containing::handle(ctx, &smiles, save_as.as_deref()).await
    }
    Commands::MolsInPatents { list, file, save_as } => {
      let source = match file {
        Some(file) => PatentSource::File(file),
        None => PatentSource::List(list),
      };
      commands::mols_in_patents::handle(ctx, &source, save_as.as_deref()).await
    }
  }
}
