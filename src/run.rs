//! Pipeline driver: configuration, decode, tag and encode as one effect chain.
//!
//! Startup steps (schema read, field names, converter) all run before the
//! input source is opened, so a configuration failure never touches a record.

use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::codec::{NdjsonDecoder, NdjsonEncoder, RecordSchema};
use crate::config::{
    DEFAULT_BODY_FIELD, DEFAULT_TAG_FIELD, ENV_BODY_NAME, ENV_SCHEMA_FILENAME, ENV_TAG_NAME,
    Environment, RunSettings, TagConfig,
};
use crate::effect::{Context, Effect, all, lift};
use crate::error::{CodecError, ConfigError, Result};
use crate::pipeline::{AddressEnricher, Converter, TagRecords};

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub records_written: u64,
}

/// Value of `key`, or a `MissingEnvVar` failure.
pub fn env_var(env: Rc<dyn Environment>, key: &'static str) -> Effect<String> {
    Effect::new(move |_| {
        env.var(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()).into())
    })
}

/// Read at most `limit` bytes of the file named by the input. Longer files
/// are truncated.
pub fn read_limited(limit: u64) -> impl Fn(String) -> Effect<String> {
    move |path: String| {
        Effect::new(move |_| {
            let mut bytes = Vec::new();
            File::open(&path)
                .and_then(|file| file.take(limit).read_to_end(&mut bytes))
                .map_err(|source| ConfigError::SchemaRead {
                    path: path.clone(),
                    source,
                })?;

            if bytes.len() as u64 == limit {
                warn!(path = %path, limit, "Schema file reached size limit; content may be truncated");
            }
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        })
    }
}

/// Field name from `key`, falling back to `default`.
pub fn field_name(env: &Rc<dyn Environment>, key: &'static str, default: &str) -> Effect<String> {
    env_var(Rc::clone(env), key).or(Effect::of(default.to_string()))
}

/// Source and tag field names resolved from the environment.
pub fn tag_config(env: &Rc<dyn Environment>) -> Effect<TagConfig> {
    let names = all(vec![
        field_name(env, ENV_BODY_NAME, DEFAULT_BODY_FIELD),
        field_name(env, ENV_TAG_NAME, DEFAULT_TAG_FIELD),
    ]);
    lift(|names: Vec<String>| {
        let mut config = TagConfig::default();
        for (slot, name) in [&mut config.source_field, &mut config.tag_field]
            .into_iter()
            .zip(names)
        {
            *slot = name;
        }
        Ok(config)
    })(names)
}

/// Converter built from the resolved config and the default enricher.
pub fn converter(env: &Rc<dyn Environment>) -> Effect<Converter> {
    tag_config(env).bind(|config| {
        lift(move |enricher: AddressEnricher| Ok(Converter::new(config.clone(), enricher)))(
            Effect::of(AddressEnricher::dotted_quad()),
        )
    })
}

/// Parsed schema, read from the file named by `ENV_SCHEMA_FILENAME`.
pub fn schema(env: &Rc<dyn Environment>, limit: u64) -> Effect<RecordSchema> {
    let text = env_var(Rc::clone(env), ENV_SCHEMA_FILENAME).bind(read_limited(limit));
    lift(|text: String| {
        debug!(bytes = text.len(), "Read schema");
        Ok(RecordSchema::parse(&text)?)
    })(text)
}

type Opener<T> = Rc<dyn Fn() -> io::Result<T>>;

/// Wires an input source and an output sink through the tagger.
pub struct Pipeline<R, W> {
    env: Rc<dyn Environment>,
    settings: RunSettings,
    open_input: Opener<R>,
    open_output: Opener<W>,
}

impl<R, W> Pipeline<R, W>
where
    R: BufRead + 'static,
    W: Write + 'static,
{
    pub fn new(
        env: impl Environment + 'static,
        settings: RunSettings,
        open_input: impl Fn() -> io::Result<R> + 'static,
        open_output: impl Fn() -> io::Result<W> + 'static,
    ) -> Self {
        Self {
            env: Rc::new(env),
            settings,
            open_input: Rc::new(open_input),
            open_output: Rc::new(open_output),
        }
    }

    /// The whole run as a single deferred effect.
    pub fn effect(&self) -> Effect<RunSummary> {
        let env = Rc::clone(&self.env);
        let open_input = Rc::clone(&self.open_input);
        let open_output = Rc::clone(&self.open_output);

        schema(&self.env, self.settings.schema_size_limit).bind(move |schema| {
            let schema = Rc::new(schema);
            let open_input = Rc::clone(&open_input);
            let open_output = Rc::clone(&open_output);

            converter(&env).bind(move |conv| {
                info!(
                    source_field = %conv.config.source_field,
                    tag_field = %conv.config.tag_field,
                    "Converter ready"
                );
                let decoded = decode(Rc::clone(&open_input), Rc::clone(&schema));
                let tagged =
                    lift(move |decoder: NdjsonDecoder<R>| Ok(conv.tag_records(decoder)))(decoded);
                encode(Rc::clone(&open_output), Rc::clone(&schema))(tagged)
            })
        })
    }

    /// Run inside a child scope of `ctx`; the scope is cancelled on return.
    pub fn run(&self, ctx: &Context) -> Result<RunSummary> {
        let scope = ctx.child();
        let result = self.effect().run(&scope);
        scope.cancel_token().cancel();
        result
    }
}

fn decode<R: BufRead + 'static>(
    open_input: Opener<R>,
    schema: Rc<RecordSchema>,
) -> Effect<NdjsonDecoder<R>> {
    Effect::new(move |ctx| {
        let reader = open_input().map_err(CodecError::from)?;
        Ok(NdjsonDecoder::new(reader, &schema, ctx.cancel_token().clone()))
    })
}

fn encode<R: BufRead + 'static, W: Write + 'static>(
    open_output: Opener<W>,
    schema: Rc<RecordSchema>,
) -> impl Fn(Effect<TagRecords<NdjsonDecoder<R>>>) -> Effect<RunSummary> {
    lift(move |tagged: TagRecords<NdjsonDecoder<R>>| {
        let writer = open_output().map_err(CodecError::from)?;
        let mut encoder = NdjsonEncoder::new(writer, &schema);
        let records_written = encoder.encode_all(tagged)?;
        info!(records_written, "Run complete");
        Ok(RunSummary { records_written })
    })
}
