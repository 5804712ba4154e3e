//! # Node registry: parsing worker commands back into specs.
//!
//! The registry is the inverse of [`Command`](crate::command::Command)
//! rendering: it splits a worker's argument list into per-node token groups
//! and parses each group into its spec. It is built once at process start
//! and read-only afterwards; node resolution is an explicit match, never
//! name-based reflection.
//!
//! ## Rules
//! - A token at a node position that names no registered node is a parse
//!   error, not a skip.
//! - An option's value is consumed together with its option; a value that
//!   happens to name a node (a directory called `log`, a cache file called
//!   `connections`) never starts a new group.
//! - Node groups may appear in any order; rendering order is a convention,
//!   not part of the contract.
//! - The command must name exactly the nodes a worker can run: at least one
//!   goal and a surface.

use std::path::PathBuf;

use crate::error::CommandError;
use crate::surfaces::SurfaceSpec;
use crate::worker::{
    CacheSpec, ConnectionsSpec, DecompositionsSpec, GoalSpec, ReporterSpec, WorkerSpec,
};

const NODES: &[&str] = &[
    "ngon",
    "connections",
    "decompositions",
    "cylinder-periodic-direction",
    "completely-cylinder-periodic",
    "log",
    "json",
    "cache",
];

/// Options that carry a value in the following token.
const VALUED_OPTIONS: &[&str] = &[
    "-a",
    "--angle",
    "--deformation",
    "--limit",
    "--deform-after",
    "--dir",
    "--file",
];

/// The set of nodes a worker knows how to build.
#[derive(Debug, Clone)]
pub struct Registry {
    nodes: &'static [&'static str],
}

impl Registry {
    /// The registry of all built-in nodes.
    pub fn builtin() -> Self {
        Self { nodes: NODES }
    }

    /// Whether `token` names a registered node.
    pub fn is_node(&self, token: &str) -> bool {
        self.nodes.contains(&token)
    }

    /// Parses a full worker argument list into a [`WorkerSpec`].
    pub fn parse(&self, tokens: &[String]) -> Result<WorkerSpec, CommandError> {
        let mut surface = None;
        let mut goals = Vec::new();
        let mut reporters = Vec::new();
        let mut connections = ConnectionsSpec::default();
        let mut decompositions = DecompositionsSpec::default();
        let mut cache = CacheSpec::default();

        let mut cursor = 0;
        while cursor < tokens.len() {
            let node = tokens[cursor].as_str();
            if !self.is_node(node) {
                return Err(CommandError::Unrecognized(node.to_string()));
            }
            let group_start = cursor + 1;
            let mut group_end = group_start;
            while group_end < tokens.len() {
                let token = tokens[group_end].as_str();
                if VALUED_OPTIONS.contains(&token) {
                    // Skip the value too; it may coincide with a node name.
                    group_end = (group_end + 2).min(tokens.len());
                } else if self.is_node(token) {
                    break;
                } else {
                    group_end += 1;
                }
            }
            let options = &tokens[group_start..group_end];
            cursor = group_end;

            match node {
                "ngon" => surface = Some(parse_ngon(options)?),
                "connections" => connections = parse_connections(options)?,
                "decompositions" => decompositions = parse_decompositions(options)?,
                "cylinder-periodic-direction" => {
                    goals.push(parse_cylinder_periodic_direction(options)?)
                }
                "completely-cylinder-periodic" => {
                    goals.push(parse_completely_cylinder_periodic(options)?)
                }
                "log" => {
                    reject_options("log", options)?;
                    reporters.push(ReporterSpec::Log);
                }
                "json" => reporters.push(parse_json_reporter(options)?),
                "cache" => cache = parse_cache(options)?,
                _ => unreachable!("every registered node is matched"),
            }
        }

        let surface = surface.ok_or(CommandError::MissingSurface)?;
        if goals.is_empty() {
            return Err(CommandError::MissingGoal);
        }
        Ok(WorkerSpec {
            surface,
            goals,
            reporters,
            connections,
            decompositions,
            cache,
        })
    }
}

struct Options<'a> {
    node: &'static str,
    tokens: &'a [String],
    cursor: usize,
}

impl<'a> Options<'a> {
    fn new(node: &'static str, tokens: &'a [String]) -> Self {
        Self {
            node,
            tokens,
            cursor: 0,
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(token.as_str())
    }

    fn value(&mut self, option: &str) -> Result<&'a str, CommandError> {
        self.next().ok_or_else(|| CommandError::MissingValue {
            node: self.node.to_string(),
            option: option.to_string(),
        })
    }

    fn parsed<T: std::str::FromStr>(&mut self, option: &str) -> Result<T, CommandError> {
        let value = self.value(option)?;
        value.parse().map_err(|_| CommandError::InvalidValue {
            node: self.node.to_string(),
            option: option.to_string(),
            value: value.to_string(),
        })
    }

    fn unexpected(&self, option: &str) -> CommandError {
        CommandError::InvalidValue {
            node: self.node.to_string(),
            option: option.to_string(),
            value: option.to_string(),
        }
    }
}

fn reject_options(node: &'static str, tokens: &[String]) -> Result<(), CommandError> {
    match tokens.first() {
        None => Ok(()),
        Some(option) => Err(Options::new(node, tokens).unexpected(option)),
    }
}

fn parse_ngon(tokens: &[String]) -> Result<SurfaceSpec, CommandError> {
    let mut options = Options::new("ngon", tokens);
    let mut angles = Vec::new();
    let mut deformation = 0;
    while let Some(option) = options.next() {
        match option {
            "-a" | "--angle" => angles.push(options.parsed("-a")?),
            "--deformation" => deformation = options.parsed("--deformation")?,
            other => return Err(options.unexpected(other)),
        }
    }
    if angles.len() < 3 {
        return Err(CommandError::InvalidValue {
            node: "ngon".to_string(),
            option: "-a".to_string(),
            value: format!("{} angle(s)", angles.len()),
        });
    }
    Ok(SurfaceSpec::Ngon {
        angles,
        deformation,
    })
}

fn parse_connections(tokens: &[String]) -> Result<ConnectionsSpec, CommandError> {
    let mut options = Options::new("connections", tokens);
    let mut spec = ConnectionsSpec::default();
    while let Some(option) = options.next() {
        match option {
            "--limit" => spec.limit = Some(options.parsed("--limit")?),
            other => return Err(options.unexpected(other)),
        }
    }
    Ok(spec)
}

fn parse_decompositions(tokens: &[String]) -> Result<DecompositionsSpec, CommandError> {
    let mut options = Options::new("decompositions", tokens);
    let mut spec = DecompositionsSpec::default();
    while let Some(option) = options.next() {
        match option {
            "--deform-after" => spec.deform_after = Some(options.parsed("--deform-after")?),
            other => return Err(options.unexpected(other)),
        }
    }
    Ok(spec)
}

fn parse_cylinder_periodic_direction(tokens: &[String]) -> Result<GoalSpec, CommandError> {
    let mut options = Options::new("cylinder-periodic-direction", tokens);
    let mut limit = None;
    let mut cache_only = false;
    while let Some(option) = options.next() {
        match option {
            "--limit" => limit = Some(options.parsed("--limit")?),
            "--cache-only" => cache_only = true,
            other => return Err(options.unexpected(other)),
        }
    }
    Ok(GoalSpec::CylinderPeriodicDirection { limit, cache_only })
}

fn parse_completely_cylinder_periodic(tokens: &[String]) -> Result<GoalSpec, CommandError> {
    let mut options = Options::new("completely-cylinder-periodic", tokens);
    let mut cache_only = false;
    while let Some(option) = options.next() {
        match option {
            "--cache-only" => cache_only = true,
            other => return Err(options.unexpected(other)),
        }
    }
    Ok(GoalSpec::CompletelyCylinderPeriodic { cache_only })
}

fn parse_json_reporter(tokens: &[String]) -> Result<ReporterSpec, CommandError> {
    let mut options = Options::new("json", tokens);
    let mut dir = PathBuf::from(".");
    while let Some(option) = options.next() {
        match option {
            "--dir" => dir = PathBuf::from(options.value("--dir")?),
            other => return Err(options.unexpected(other)),
        }
    }
    Ok(ReporterSpec::Json { dir })
}

fn parse_cache(tokens: &[String]) -> Result<CacheSpec, CommandError> {
    let mut options = Options::new("cache", tokens);
    let mut files = Vec::new();
    while let Some(option) = options.next() {
        match option {
            "--file" => files.push(PathBuf::from(options.value("--file")?)),
            other => return Err(options.unexpected(other)),
        }
    }
    Ok(CacheSpec::Json { files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn rendered_commands_parse_back_to_the_same_spec() {
        let spec = WorkerSpec {
            surface: SurfaceSpec::Ngon {
                angles: vec![1, 2, 5],
                deformation: 2,
            },
            goals: vec![
                GoalSpec::CylinderPeriodicDirection {
                    limit: Some(64),
                    cache_only: false,
                },
                GoalSpec::CompletelyCylinderPeriodic { cache_only: true },
            ],
            reporters: vec![
                ReporterSpec::Log,
                ReporterSpec::Json {
                    dir: PathBuf::from("results"),
                },
            ],
            connections: ConnectionsSpec { limit: Some(256) },
            decompositions: DecompositionsSpec {
                deform_after: Some(16),
            },
            cache: CacheSpec::Json {
                files: vec![PathBuf::from("prior.json")],
            },
        };

        let parsed = Registry::builtin().parse(&spec.command()).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn option_values_that_name_nodes_stay_values() {
        let spec = WorkerSpec {
            surface: SurfaceSpec::Ngon {
                angles: vec![1, 1, 2],
                deformation: 0,
            },
            goals: vec![GoalSpec::CompletelyCylinderPeriodic { cache_only: false }],
            reporters: vec![ReporterSpec::Json {
                dir: PathBuf::from("log"),
            }],
            connections: ConnectionsSpec::default(),
            decompositions: DecompositionsSpec::default(),
            cache: CacheSpec::Json {
                files: vec![PathBuf::from("connections")],
            },
        };

        // A results directory called "log" and a cache file called
        // "connections" must survive the round trip unscathed.
        let parsed = Registry::builtin().parse(&spec.command()).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn node_groups_parse_in_any_order() {
        let parsed = Registry::builtin()
            .parse(&tokens(&[
                "ngon",
                "-a",
                "1",
                "-a",
                "1",
                "-a",
                "2",
                "cylinder-periodic-direction",
                "log",
            ]))
            .unwrap();
        assert_eq!(
            parsed.surface,
            SurfaceSpec::Ngon {
                angles: vec![1, 1, 2],
                deformation: 0,
            }
        );
        assert_eq!(parsed.reporters, vec![ReporterSpec::Log]);
    }

    #[test]
    fn unknown_nodes_and_options_are_errors() {
        let registry = Registry::builtin();

        assert_eq!(
            registry.parse(&tokens(&["frobnicate"])),
            Err(CommandError::Unrecognized("frobnicate".to_string()))
        );

        let err = registry
            .parse(&tokens(&[
                "cylinder-periodic-direction",
                "--frob",
                "ngon",
                "-a",
                "1",
                "-a",
                "1",
                "-a",
                "1",
            ]))
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidValue { .. }));
    }

    #[test]
    fn missing_surface_or_goal_is_an_error() {
        let registry = Registry::builtin();

        assert_eq!(
            registry.parse(&tokens(&["cylinder-periodic-direction"])),
            Err(CommandError::MissingSurface)
        );
        assert_eq!(
            registry.parse(&tokens(&["ngon", "-a", "1", "-a", "1", "-a", "1"])),
            Err(CommandError::MissingGoal)
        );
    }

    #[test]
    fn missing_and_invalid_values_are_distinguished() {
        let registry = Registry::builtin();

        assert_eq!(
            registry.parse(&tokens(&["connections", "--limit"])),
            Err(CommandError::MissingValue {
                node: "connections".to_string(),
                option: "--limit".to_string(),
            })
        );
        assert_eq!(
            registry.parse(&tokens(&["connections", "--limit", "many"])),
            Err(CommandError::InvalidValue {
                node: "connections".to_string(),
                option: "--limit".to_string(),
                value: "many".to_string(),
            })
        );
    }
}
