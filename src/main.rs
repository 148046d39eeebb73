use log::{debug, info};
use serde::Serialize;
use std::env;
use std::process::ExitCode;

use tag_studio::store::NewGalleryItem;
use tag_studio::{
    import_parsed, parse_tags_input, AppSettings, ConfigStore, DocumentStore, GalleryStore,
    ImageFiles, LlmConfigUpdate, TagError, TagPipeline, TagStore, WishMode,
};

const USAGE: &str = "Usage: tag-studio <command> [args]

Commands:
  parse <text>                   Split prompt text into tag candidates
  ingest <text>                  Translate and categorize candidates
  import [--force] <text>        Ingest and add new tags to the library
  relevance <category-id>        Library tags the LLM considers part of a category
  reorder <text>                 Reorder tags for image generation
  describe <text>                Rewrite tags as a prose description
  wish [--modify <text>] <wish>  Generate or revise tags from a wish
  config                         Show the LLM settings (key masked)
  set-llm key=value...           Update LLM settings (enabled, provider, api_key, base_url, model)
  test-llm                       Send a test message with the saved LLM settings
  gallery                        List gallery items
  gallery-add <image> [title] [positive] [negative]
                                 Copy an image into the gallery
  gallery-remove <id>            Delete a gallery item and its image";

fn print_json<T: Serialize>(value: &T) -> Result<(), TagError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn required<'a>(args: &'a [String], what: &str) -> Result<&'a str, TagError> {
    args.first()
        .map(String::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| TagError::InvalidInput(format!("{} is required", what)))
}

fn parse_update(pairs: &[String]) -> Result<LlmConfigUpdate, TagError> {
    let mut update = LlmConfigUpdate::default();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| TagError::InvalidInput(format!("expected key=value, got '{}'", pair)))?;
        match key {
            "enabled" => {
                update.enabled = Some(value.parse().map_err(|_| {
                    TagError::InvalidInput(format!("enabled must be true or false, got '{}'", value))
                })?)
            }
            "provider" => update.provider = Some(value.parse().map_err(TagError::InvalidInput)?),
            "api_key" => update.api_key = Some(value.to_string()),
            "base_url" => update.base_url = Some(value.to_string()),
            "model" => update.model = Some(value.to_string()),
            other => {
                return Err(TagError::InvalidInput(format!("unknown setting '{}'", other)));
            }
        }
    }
    Ok(update)
}

async fn run(command: &str, args: &[String]) -> Result<(), TagError> {
    let settings = AppSettings::load()?;
    debug!("{:?}", settings);

    let config_store = ConfigStore::new(settings.config_path());
    let tag_store = TagStore::new(settings.tags_path());
    let mut config_document = config_store.load();
    let pipeline = TagPipeline::builder()
        .settings(&settings)
        .llm_config(config_document.llm.clone())
        .build();

    match command {
        "parse" => print_json(&parse_tags_input(required(args, "text")?)),
        "ingest" => {
            let library = tag_store.load();
            let outcome = pipeline
                .ingest(required(args, "text")?, &library.categories, &library.tags)
                .await?;
            print_json(&outcome)
        }
        "import" => {
            let (force, rest) = match args.split_first() {
                Some((flag, rest)) if flag == "--force" => (true, rest),
                _ => (false, args),
            };
            let mut library = tag_store.load();
            let outcome = pipeline
                .ingest(required(rest, "text")?, &library.categories, &library.tags)
                .await?;
            let summary = import_parsed(&mut library, &outcome.results, force);
            tag_store.save(&library)?;
            print_json(&summary)
        }
        "relevance" => {
            let library = tag_store.load();
            let category_id = required(args, "category id")?;
            let category = library.category(category_id).ok_or_else(|| {
                TagError::InvalidInput(format!("unknown category '{}'", category_id))
            })?;
            print_json(&pipeline.filter_relevant(&library.tags, category).await?)
        }
        "reorder" => {
            let tags = parse_tags_input(required(args, "text")?);
            print_json(&pipeline.reorder(&tags).await?)
        }
        "describe" => {
            let tags = parse_tags_input(required(args, "text")?);
            println!("{}", pipeline.to_natural_language(&tags).await?);
            Ok(())
        }
        "wish" => {
            let library = tag_store.load();
            let (current, rest) = match args {
                [flag, current, rest @ ..] if flag == "--modify" => (Some(current.as_str()), rest),
                _ => (None, args),
            };
            let selected: Vec<_> = current
                .map(|text| {
                    let wanted = parse_tags_input(text);
                    library
                        .tags
                        .iter()
                        .filter(|t| wanted.iter().any(|w| w.eq_ignore_ascii_case(&t.name_en)))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            let mode = match current {
                Some(_) => WishMode::Modify(&selected),
                None => WishMode::Generate,
            };
            let tags = pipeline
                .wish(required(rest, "wish")?, mode, &library.tags, &library.categories)
                .await?;
            print_json(&tags)
        }
        "config" => print_json(&config_document.llm.masked()),
        "set-llm" => {
            config_document.llm.apply(parse_update(args)?);
            config_store.save(&config_document)?;
            info!("Saved LLM settings to {}", config_store.path().display());
            print_json(&config_document.llm.masked())
        }
        "test-llm" => {
            let reply = pipeline.test_connection(pipeline.llm_config()).await?;
            println!("Connection successful: {}", reply);
            Ok(())
        }
        "gallery" => print_json(&GalleryStore::new(settings.gallery_path()).load()),
        "gallery-add" => {
            let source = required(args, "image path")?;
            let bytes = tokio::fs::read(source).await?;
            let files = ImageFiles::new(&settings.upload_dir);
            let image = files.save(source, &bytes).await?;

            let text = |i: usize| args.get(i).cloned().unwrap_or_default();
            let store = GalleryStore::new(settings.gallery_path());
            let mut gallery = store.load();
            let item = gallery.add(
                NewGalleryItem {
                    title: text(1),
                    positive_prompt: text(2),
                    negative_prompt: text(3),
                },
                image,
            );
            store.save(&gallery)?;
            print_json(&item)
        }
        "gallery-remove" => {
            let id = required(args, "item id")?;
            let store = GalleryStore::new(settings.gallery_path());
            let mut gallery = store.load();
            if !gallery
                .remove(id, &ImageFiles::new(&settings.upload_dir))
                .await?
            {
                return Err(TagError::InvalidInput(format!("unknown gallery item '{}'", id)));
            }
            store.save(&gallery)?;
            info!("Removed gallery item {}", id);
            Ok(())
        }
        other => Err(TagError::InvalidInput(format!(
            "unknown command '{}'\n\n{}",
            other, USAGE
        ))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };

    match run(command, rest).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
