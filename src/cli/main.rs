//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Mailspace.
//
// Mailspace is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailspace is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mailspace. If not, see <http://www.gnu.org/licenses/>.

use std::io::{self, BufRead};
use std::path::PathBuf;

use log::{debug, info};
use structopt::StructOpt;

use super::sysexits::*;
use mailspace::namespace::exists_trivially;
use mailspace::{
    Error, Name, NamedCodec, NamespaceConfig, Owner, Resolver,
};

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Resolve a mailbox name as a client would send it.
    ///
    /// The name is read in the IMAP wire format (modified UTF-7, delimited
    /// by `.`) and printed in canonical form.
    Resolve(ResolveSubcommand),
    /// Show how a canonical mailbox name appears to a user.
    Unresolve(ResolveSubcommand),
    /// Print the owner of a canonical mailbox name.
    Owner(OwnerSubcommand),
    /// Filter canonical names on standard input by a LIST pattern.
    ///
    /// Each line of standard input is a canonical mailbox name. Those
    /// matching the reference and pattern, interpreted as a LIST command from
    /// the given user, are printed in the order that user would see them.
    List(ListSubcommand),
    /// Encode a list of segments with a named codec.
    Encode(EncodeSubcommand),
    /// Decode a string with a named codec and print one segment per line.
    Decode(DecodeSubcommand),
}

#[derive(StructOpt)]
struct CommonOptions {
    /// TOML file defining the namespace tokens [default: built-in tokens]
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// log4rs configuration file. If not given, log to standard error.
    #[structopt(long, parse(from_os_str))]
    log_config: Option<PathBuf>,

    /// Increase logging verbosity. Can be passed multiple times.
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u64,
}

#[derive(StructOpt)]
struct ResolveSubcommand {
    #[structopt(flatten)]
    common: CommonOptions,

    /// The login of the current user, e.g. `joe` or `alice@example.com`.
    #[structopt(short, long)]
    user: String,

    /// The codec for canonical names.
    #[structopt(long, default_value = "path")]
    codec: NamedCodec,

    /// The name to translate.
    name: String,
}

#[derive(StructOpt)]
struct OwnerSubcommand {
    #[structopt(flatten)]
    common: CommonOptions,

    /// The codec for canonical names.
    #[structopt(long, default_value = "path")]
    codec: NamedCodec,

    /// The canonical name.
    name: String,
}

#[derive(StructOpt)]
struct ListSubcommand {
    #[structopt(flatten)]
    common: CommonOptions,

    /// The login of the current user.
    #[structopt(short, long)]
    user: String,

    /// The codec for the canonical names on standard input and output.
    #[structopt(long, default_value = "path")]
    codec: NamedCodec,

    /// The LIST reference, in wire format.
    reference: String,

    /// The LIST pattern, in wire format.
    pattern: String,
}

#[derive(StructOpt)]
struct EncodeSubcommand {
    #[structopt(flatten)]
    common: CommonOptions,

    /// One of wire, wire-pessimistic, storage, path, index.
    #[structopt(long)]
    codec: NamedCodec,

    segments: Vec<String>,
}

#[derive(StructOpt)]
struct DecodeSubcommand {
    #[structopt(flatten)]
    common: CommonOptions,

    /// One of wire, wire-pessimistic, storage, path, index.
    #[structopt(long)]
    codec: NamedCodec,

    text: String,
}

impl Command {
    fn common_options(&self) -> &CommonOptions {
        match *self {
            Command::Resolve(ref c) | Command::Unresolve(ref c) => &c.common,
            Command::Owner(ref c) => &c.common,
            Command::List(ref c) => &c.common,
            Command::Encode(ref c) => &c.common,
            Command::Decode(ref c) => &c.common,
        }
    }
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    init_logging(cmd.common_options());
    let resolver = load_resolver(cmd.common_options());

    let result = match cmd {
        Command::Resolve(c) => resolve(&resolver, c),
        Command::Unresolve(c) => unresolve(&resolver, c),
        Command::Owner(c) => owner(&resolver, c),
        Command::List(c) => list(&resolver, c),
        Command::Encode(c) => {
            println!("{}", c.codec.encode_segments(c.segments.iter().map(|s| &**s)));
            Ok(())
        }
        Command::Decode(c) => c.codec.decode(&c.text).map(|name| {
            for segment in name.segments() {
                println!("{}", segment);
            }
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        Sysexit::for_error(&e).exit();
    }
}

fn init_logging(common: &CommonOptions) {
    if let Some(ref path) = common.log_config {
        if let Err(e) =
            log4rs::init_file(path, log4rs::file::Deserializers::new())
        {
            eprintln!("Error in log config at '{}': {}", path.display(), e);
            EX_CONFIG.exit();
        }
        return;
    }

    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;

    let level = match common.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S%.3f)} [{l}][{t}] {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level));

    match config.map(log4rs::init_config) {
        Ok(Ok(_)) => (),
        Ok(Err(e)) => {
            eprintln!("Failed to initialise logging: {}", e);
            EX_SOFTWARE.exit()
        }
        Err(e) => {
            eprintln!("Failed to initialise logging: {}", e);
            EX_SOFTWARE.exit()
        }
    }
}

fn load_resolver(common: &CommonOptions) -> Resolver {
    let config = match common.config {
        None => NamespaceConfig::default(),
        Some(ref path) => match NamespaceConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error in config file at '{}': {}", path.display(), e);
                EX_CONFIG.exit()
            }
        },
    };

    debug!("Namespace configuration: {:?}", config);
    Resolver::new(&config)
}

fn resolve(resolver: &Resolver, cmd: ResolveSubcommand) -> Result<(), Error> {
    let user = Owner::from_login(&cmd.user)?;
    let name = NamedCodec::Wire.decode(&cmd.name)?;
    let resolved = resolver.resolve(&name, &user)?;
    info!("{} resolved {:?} to {:?}", user, name, resolved);

    if resolved.is_rooted() {
        println!("{}", cmd.codec.encode(&resolved));
    } else {
        println!("(relative) {}", cmd.codec.encode(&resolved));
    }
    Ok(())
}

fn unresolve(resolver: &Resolver, cmd: ResolveSubcommand) -> Result<(), Error> {
    let user = Owner::from_login(&cmd.user)?;
    let name = cmd.codec.decode_name(&cmd.name, true)?;
    let unresolved = resolver.unresolve(&name, &user)?;
    println!(
        "{}",
        NamedCodec::Wire.encode_segments(unresolved.segments())
    );
    Ok(())
}

fn owner(resolver: &Resolver, cmd: OwnerSubcommand) -> Result<(), Error> {
    let name = cmd.codec.decode_name(&cmd.name, true)?;
    match resolver.get_owner(&name) {
        Some(owner) => println!("{}", owner),
        None if exists_trivially(&name) => println!("(namespace node)"),
        None => println!("(no owner)"),
    }
    Ok(())
}

fn list(resolver: &Resolver, cmd: ListSubcommand) -> Result<(), Error> {
    let user = Owner::from_login(&cmd.user)?;
    let reference = NamedCodec::Wire.decode(&cmd.reference)?;
    let pattern = NamedCodec::Wire.decode(&cmd.pattern)?;
    let query = resolver.compile_query(&reference, &pattern, &user)?;
    info!(
        "{} listing {:?} using {:?} strategy",
        user,
        query.resolved_expression(),
        query.strategy()
    );

    let mut matched = Vec::<Name>::new();
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let name = cmd.codec.decode_name(&line, true)?;
        if query.is_expression_match(&name) {
            matched.push(name);
        }
    }

    resolver.contextualized_comparator(&user).sort(&mut matched);
    for name in &matched {
        println!("{}", cmd.codec.encode(name));
    }
    Ok(())
}
