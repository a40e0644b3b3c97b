use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use legato::import::ExternalTrackRecord;
use legato::key::{OpenKey, all_keys, parse_key};
use legato::library::MixLibrary;
use legato::rules::{self, RuleId, Suggestion};
use legato::share;
use legato::store::{SqliteStore, resolve_store_path};
use legato::templates::TEMPLATES;
use legato::timeline::{CreateMixOptions, Mix, Track, TransitionDescriptor};

#[derive(Parser)]
#[command(name = "legato", version, about = "Harmonic mixing on the Open Key wheel")]
struct Cli {
    /// Mix store (defaults to LEGATO_STORE_PATH, then the user data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// List all 24 keys
    Keys,
    /// Suggest next keys from an anchor key
    Suggest {
        #[arg(value_parser = key_arg)]
        key: OpenKey,
    },
    /// Name the rule connecting two keys
    Match {
        #[arg(value_parser = key_arg)]
        from: OpenKey,
        #[arg(value_parser = key_arg)]
        to: OpenKey,
    },
    /// Project a key through one rule
    Apply {
        rule: RuleId,
        #[arg(value_parser = key_arg)]
        key: OpenKey,
    },
    /// List mix templates
    Templates,
    #[command(flatten)]
    Stored(StoredCommand),
}

/// Commands that read or write the mix store.
#[derive(clap::Subcommand)]
enum StoredCommand {
    /// Create a mix
    New(NewArgs),
    /// List stored mixes
    List,
    /// Show a mix with its transitions and next-key suggestions
    Show { mix: String },
    /// Append a track
    Add {
        mix: String,
        #[arg(value_parser = key_arg)]
        key: OpenKey,
    },
    /// Set a track's title and/or details
    Edit(EditArgs),
    /// Remove a track
    Remove { mix: String, track: String },
    /// Move a track to a 0-based position
    Move {
        mix: String,
        track: String,
        index: usize,
    },
    /// Rename a mix
    Rename { mix: String, name: String },
    /// Remove every track from a mix
    Clear { mix: String },
    /// Delete a mix
    Delete { mix: String },
    /// Import a playlist from a JSON array of track records
    Import { name: String, records: PathBuf },
    /// Print a share token for a mix
    Share { mix: String },
    /// Add the mix carried by a share token
    Open { token: String },
}

#[derive(clap::Args)]
struct NewArgs {
    /// Mix name
    #[arg(long)]
    name: Option<String>,
    /// Seed from a template id
    #[arg(long, conflicts_with_all = ["keys", "start"])]
    template: Option<String>,
    /// Seed keys, e.g. `--keys 8m 9m 9d`
    #[arg(long, num_args = 1.., value_parser = key_arg)]
    keys: Vec<OpenKey>,
    /// Start key for an empty mix
    #[arg(long, value_parser = key_arg)]
    start: Option<OpenKey>,
}

#[derive(clap::Args)]
struct EditArgs {
    mix: String,
    track: String,
    /// New track title
    #[arg(long)]
    title: Option<String>,
    /// New free-form details, e.g. a tempo
    #[arg(long)]
    details: Option<String>,
    /// New key
    #[arg(long, value_parser = key_arg)]
    key: Option<OpenKey>,
}

fn key_arg(raw: &str) -> Result<OpenKey, String> {
    parse_key(raw).ok_or_else(|| format!("'{raw}' is not an Open Key (e.g. 8m, 12d, 8A)"))
}

#[derive(Serialize)]
struct MixView<'a> {
    #[serde(flatten)]
    mix: &'a Mix,
    transitions: Vec<TrackTransition<'a>>,
    anchor_key: String,
    suggestions: Vec<Suggestion>,
}

#[derive(Serialize)]
struct TrackTransition<'a> {
    track: &'a Track,
    transition: TransitionDescriptor,
}

impl<'a> MixView<'a> {
    fn new(mix: &'a Mix) -> Self {
        Self {
            mix,
            transitions: mix
                .tracks
                .iter()
                .zip(mix.transitions())
                .map(|(track, transition)| TrackTransition { track, transition })
                .collect(),
            anchor_key: mix.anchor_key().to_string(),
            suggestions: mix.suggestions(),
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_library(store: Option<PathBuf>) -> Result<MixLibrary<SqliteStore>, Box<dyn std::error::Error>> {
    let path = store.unwrap_or_else(resolve_store_path);
    let path = path
        .to_str()
        .ok_or_else(|| format!("store path {} is not valid UTF-8", path.display()))?
        .to_string();
    Ok(MixLibrary::open(SqliteStore::open(&path)?))
}

/// Apply `op` to a stored mix, then print the updated mix.
fn edit_and_show<R>(
    library: &mut MixLibrary<SqliteStore>,
    mix_id: &str,
    op: impl FnOnce(&mut Mix) -> R,
) -> Result<R, Box<dyn std::error::Error>> {
    let result = library
        .edit(mix_id, op)
        .ok_or_else(|| format!("no mix with id '{mix_id}'"))?;
    if let Some(mix) = library.get(mix_id) {
        print_json(&MixView::new(mix))?;
    }
    Ok(result)
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Keys => {
            let keys: Vec<String> = all_keys().iter().map(OpenKey::to_string).collect();
            print_json(&keys)
        }
        Command::Suggest { key } => print_json(&rules::suggest(key)),
        Command::Match { from, to } => {
            let rule = rules::match_rule(from, to).map(|rule| rule.id);
            print_json(&serde_json::json!({
                "from": from.to_string(),
                "to": to.to_string(),
                "rule": rule,
                "transition": legato::timeline::describe_transition(Some(from), to),
            }))
        }
        Command::Apply { rule, key } => print_json(&rules::apply(rule, key).to_string()),
        Command::Templates => print_json(TEMPLATES),
        Command::Stored(command) => run_stored(cli.store, command),
    }
}

fn run_stored(store: Option<PathBuf>, command: StoredCommand) -> Result<(), Box<dyn std::error::Error>> {
    let mut library = open_library(store)?;
    match command {
        StoredCommand::New(args) => {
            let mix = match args.template {
                Some(template_id) => {
                    let id = library
                        .create_from_template(&template_id)
                        .ok_or_else(|| format!("unknown template '{template_id}'"))?
                        .id
                        .clone();
                    if let Some(name) = args.name {
                        library.edit(&id, |mix| mix.rename(&name));
                    }
                    library.get(&id)
                }
                None => {
                    let id = library
                        .create(CreateMixOptions {
                            name: args.name,
                            seed_keys: args.keys,
                            start_key: args.start,
                        })
                        .id
                        .clone();
                    library.get(&id)
                }
            };
            match mix {
                Some(mix) => print_json(&MixView::new(mix)),
                None => Ok(()),
            }
        }
        StoredCommand::List => {
            let summaries: Vec<serde_json::Value> = library
                .mixes()
                .iter()
                .map(|mix| {
                    serde_json::json!({
                        "id": mix.id,
                        "name": mix.name,
                        "start_key": mix.start_key.to_string(),
                        "tracks": mix.tracks.len(),
                        "created_at": mix.created_at,
                    })
                })
                .collect();
            print_json(&summaries)
        }
        StoredCommand::Show { mix } => {
            let mix = library
                .get(&mix)
                .ok_or_else(|| format!("no mix with id '{mix}'"))?;
            print_json(&MixView::new(mix))
        }
        StoredCommand::Add { mix, key } => edit_and_show(&mut library, &mix, |m| {
            m.append(key);
        }),
        StoredCommand::Edit(args) => {
            let found = edit_and_show(&mut library, &args.mix, |m| {
                let mut found = m.update_track_fields(
                    &args.track,
                    legato::timeline::TrackUpdate {
                        title: args.title,
                        details: args.details,
                    },
                );
                if let Some(key) = args.key {
                    found = m.update_track_key(&args.track, key) || found;
                }
                found
            })?;
            if !found {
                eprintln!("No track with id '{}'; mix unchanged.", args.track);
            }
            Ok(())
        }
        StoredCommand::Remove { mix, track } => {
            if !edit_and_show(&mut library, &mix, |m| m.remove(&track))? {
                eprintln!("No track with id '{track}'; mix unchanged.");
            }
            Ok(())
        }
        StoredCommand::Move { mix, track, index } => {
            edit_and_show(&mut library, &mix, |m| m.move_track(&track, index))?;
            Ok(())
        }
        StoredCommand::Rename { mix, name } => edit_and_show(&mut library, &mix, |m| m.rename(&name)),
        StoredCommand::Clear { mix } => edit_and_show(&mut library, &mix, Mix::clear),
        StoredCommand::Delete { mix } => {
            if !library.delete(&mix) {
                return Err(format!("no mix with id '{mix}'").into());
            }
            eprintln!("Deleted {mix}.");
            Ok(())
        }
        StoredCommand::Import { name, records } => {
            let raw = std::fs::read_to_string(&records)?;
            let records: Vec<ExternalTrackRecord> = serde_json::from_str(&raw)
                .map_err(|e| format!("{} is not a JSON array of track records: {e}", records.display()))?;
            let mix = library.import_playlist(&name, &records);
            print_json(&MixView::new(mix))
        }
        StoredCommand::Share { mix } => {
            let mix = library
                .get(&mix)
                .ok_or_else(|| format!("no mix with id '{mix}'"))?;
            println!("{}", share::encode(mix));
            Ok(())
        }
        StoredCommand::Open { token } => {
            let mix = library
                .open_shared(&token)
                .ok_or("share token could not be decoded")?;
            print_json(&MixView::new(mix))
        }
    }
}
