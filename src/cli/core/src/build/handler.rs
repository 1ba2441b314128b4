/* src/cli/core/src/build/handler.rs */

// Lambda entry point rendered from fixed fragments. Every caller-supplied
// value is emitted as a JSON literal.

use anyhow::{Context, Result};
use nucel_runtime::{RESERVED_NAMES, RESERVED_PREFIXES, TEXT_CONTENT_TYPES};
use serde::Serialize;

use crate::config::{HeaderRule, ProjectConfig, RedirectRule, RewriteRule};

/// File the handler is rendered to before packaging turns it into the entry point.
pub const HANDLER_SOURCE_FILE: &str = "__nucel_handler.mjs";

/// Environment variable carrying headers/rewrites/redirects to the handler.
pub const ROUTING_ENV: &str = "NUCEL_ROUTING";

/// Port the Next.js standalone server listens on inside the function.
const NEXT_PORT: u16 = 3000;

/// How the handler reaches the framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameworkEntry {
  /// Next.js standalone `server.js`, started in-process and reached over loopback.
  NextStandalone { server: String },
  /// SvelteKit `Server` class plus its manifest.
  SvelteKit { server: String, manifest: String },
  /// React Router server build passed to `createRequestHandler`.
  ReactRouter { build: String },
  /// Module exporting a Hono `app`.
  Hono { app: String },
}

#[derive(Debug, Clone)]
pub struct HandlerSource {
  entry: FrameworkEntry,
  env_prefix: String,
  polyfill: bool,
  streaming: bool,
}

fn js(value: &str) -> String {
  serde_json::Value::String(value.to_string()).to_string()
}

fn js_list(values: &[&str]) -> String {
  serde_json::Value::from(values.to_vec()).to_string()
}

impl HandlerSource {
  pub fn new(entry: FrameworkEntry) -> Self {
    Self { entry, env_prefix: String::new(), polyfill: true, streaming: false }
  }

  pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.env_prefix = prefix.into();
    self
  }

  pub fn polyfill(mut self, enabled: bool) -> Self {
    self.polyfill = enabled;
    self
  }

  pub fn streaming(mut self, enabled: bool) -> Self {
    self.streaming = enabled;
    self
  }

  pub fn entry(&self) -> &FrameworkEntry {
    &self.entry
  }

  pub fn render(&self) -> String {
    let mut out = String::from("// Generated by nucel. Do not edit.\n");
    if self.polyfill {
      out.push_str(POLYFILL);
    }
    out.push_str(&self.imports());
    out.push('\n');
    out.push_str(&format!(
      "const ENV_PREFIX = {};\nconst RESERVED_PREFIXES = {};\nconst RESERVED_NAMES = {};\n\
       const TEXT_TYPES = {};\nconst ROUTING_ENV = {};\n\
       const ROUTING = JSON.parse(process.env[ROUTING_ENV] || \"{{}}\");\n",
      js(&self.env_prefix),
      js_list(RESERVED_PREFIXES),
      js_list(RESERVED_NAMES),
      js_list(TEXT_CONTENT_TYPES),
      js(ROUTING_ENV),
    ));
    out.push_str(ENV_FILTER);
    out.push_str(ROUTING);
    out.push_str(REQUEST);
    out.push_str(&self.dispatch());
    out.push_str(HANDLE);
    if self.streaming {
      out.push_str(STREAMING_EXPORT);
    } else {
      out.push_str(RESPONSE);
      out.push_str(BUFFERED_EXPORT);
    }
    out
  }

  fn imports(&self) -> String {
    match &self.entry {
      FrameworkEntry::NextStandalone { .. } => String::new(),
      FrameworkEntry::SvelteKit { server, manifest } => format!(
        "import {{ Server }} from {};\nimport {{ manifest }} from {};\n",
        js(server),
        js(manifest)
      ),
      FrameworkEntry::ReactRouter { build } => format!(
        "import {{ createRequestHandler }} from \"react-router\";\nimport * as build from {};\n",
        js(build)
      ),
      FrameworkEntry::Hono { app } => format!("import {{ app }} from {};\n", js(app)),
    }
  }

  fn dispatch(&self) -> String {
    match &self.entry {
      FrameworkEntry::NextStandalone { server } => format!(
        "const NEXT_SERVER = {};\nconst NEXT_PORT = {NEXT_PORT};\n{NEXT_DISPATCH}",
        js(server)
      ),
      FrameworkEntry::SvelteKit { .. } => SVELTEKIT_DISPATCH.to_string(),
      FrameworkEntry::ReactRouter { .. } => REACT_ROUTER_DISPATCH.to_string(),
      FrameworkEntry::Hono { .. } => HONO_DISPATCH.to_string(),
    }
  }
}

/// Shape of `NUCEL_ROUTING`.
#[derive(Debug, Serialize)]
pub struct RoutingTable<'a> {
  pub headers: &'a [HeaderRule],
  pub rewrites: &'a [RewriteRule],
  pub redirects: &'a [RedirectRule],
}

/// JSON for `NUCEL_ROUTING`, or `None` when the project declares no rules.
pub fn routing_env(project: &ProjectConfig) -> Result<Option<String>> {
  if !project.has_routing_rules() {
    return Ok(None);
  }
  let table = RoutingTable {
    headers: &project.headers,
    rewrites: &project.rewrites,
    redirects: &project.redirects,
  };
  serde_json::to_string(&table).map(Some).context("failed to serialize routing rules")
}

const POLYFILL: &str = r#"import { webcrypto } from "node:crypto";
import { File } from "node:buffer";
if (!globalThis.crypto) globalThis.crypto = webcrypto;
if (!globalThis.File) globalThis.File = File;
"#;

const ENV_FILTER: &str = r#"
const VALID_NAME = /^[a-zA-Z][a-zA-Z0-9_]*$/;

function filterEnv(source) {
  const out = {};
  for (const [name, value] of Object.entries(source)) {
    if (value === undefined || !VALID_NAME.test(name) || name === ROUTING_ENV) continue;
    if (RESERVED_NAMES.includes(name) || RESERVED_PREFIXES.some((p) => name.startsWith(p))) continue;
    if (ENV_PREFIX && !name.startsWith(ENV_PREFIX)) continue;
    out[name] = value;
  }
  return out;
}

const APP_ENV = filterEnv(process.env);
"#;

const ROUTING: &str = r#"
function matchSource(source, pathname) {
  if (source.endsWith("/*")) {
    const base = source.slice(0, -2);
    if (pathname === base || pathname.startsWith(base + "/")) return pathname.slice(base.length);
    return null;
  }
  return source === pathname ? "" : null;
}

function substitute(destination, rest) {
  return destination.endsWith("/*") ? destination.slice(0, -2) + rest : destination;
}

function applyRouting(url) {
  for (const rule of ROUTING.redirects || []) {
    const rest = matchSource(rule.source, url.pathname);
    if (rest !== null) {
      const location = substitute(rule.destination, rest);
      return { redirect: new Response(null, { status: rule.permanent ? 308 : 307, headers: { location } }) };
    }
  }
  const target = new URL(url);
  for (const rule of ROUTING.rewrites || []) {
    const rest = matchSource(rule.source, url.pathname);
    if (rest !== null) {
      const rewritten = new URL(substitute(rule.destination, rest), url);
      target.pathname = rewritten.pathname;
      if (rewritten.search) target.search = rewritten.search;
      break;
    }
  }
  return { url: target };
}

function routeHeaders(pathname) {
  const out = [];
  for (const rule of ROUTING.headers || []) {
    if (matchSource(rule.source, pathname) === null) continue;
    for (const [key, value] of Object.entries(rule.values)) out.push([key, value]);
  }
  return out;
}
"#;

const REQUEST: &str = r#"
function isUrlEvent(event) {
  return Boolean(event.requestContext && event.requestContext.http);
}

function stripStage(path, stage) {
  if (!stage || stage === "$default") return path;
  const prefix = "/" + stage;
  if (path === prefix) return "/";
  return path.startsWith(prefix + "/") ? path.slice(prefix.length) : path;
}

function toRequest(event) {
  const headers = new Headers();
  for (const [key, value] of Object.entries(event.headers || {})) {
    if (value != null) headers.set(key, value);
  }
  let method, path, query;
  if (isUrlEvent(event)) {
    method = event.requestContext.http.method;
    path = event.rawPath || "/";
    query = event.rawQueryString || "";
    if (event.cookies && event.cookies.length) headers.set("cookie", event.cookies.join("; "));
  } else {
    method = event.httpMethod;
    path = stripStage(event.path || "/", event.requestContext && event.requestContext.stage);
    const params = new URLSearchParams();
    if (event.multiValueQueryStringParameters) {
      for (const [key, values] of Object.entries(event.multiValueQueryStringParameters)) {
        for (const value of values) params.append(key, value);
      }
    } else {
      for (const [key, value] of Object.entries(event.queryStringParameters || {})) params.append(key, value);
    }
    query = params.toString();
    for (const [key, values] of Object.entries(event.multiValueHeaders || {})) {
      if (values && values.length) headers.set(key, values.join(", "));
    }
  }
  const host = headers.get("host") || (event.requestContext && event.requestContext.domainName) || "localhost";
  const url = new URL(`https://${host}${path}${query ? "?" + query : ""}`);
  let body;
  if (event.body != null && method !== "GET" && method !== "HEAD") {
    body = event.isBase64Encoded ? Buffer.from(event.body, "base64") : event.body;
  }
  return { method, url, headers, body };
}
"#;

const NEXT_DISPATCH: &str = r#"let nextReady;

async function waitForNext() {
  for (let attempt = 0; attempt < 200; attempt++) {
    try {
      await fetch(`http://127.0.0.1:${NEXT_PORT}/`, { method: "HEAD" });
      return;
    } catch {
      await new Promise((resolve) => setTimeout(resolve, 25));
    }
  }
  throw new Error("next server did not start");
}

function startNext() {
  if (!nextReady) {
    process.env.PORT = String(NEXT_PORT);
    process.env.HOSTNAME = "127.0.0.1";
    nextReady = import(NEXT_SERVER).then(waitForNext);
  }
  return nextReady;
}

async function dispatch(request) {
  await startNext();
  const url = new URL(request.url);
  const headers = new Headers(request.headers);
  headers.set("x-forwarded-host", url.host);
  headers.set("x-forwarded-proto", "https");
  headers.delete("accept-encoding");
  const upstream = await fetch(`http://127.0.0.1:${NEXT_PORT}${url.pathname}${url.search}`, {
    method: request.method,
    headers,
    body: request.body,
    duplex: "half",
    redirect: "manual",
  });
  const out = new Headers(upstream.headers);
  out.delete("content-encoding");
  out.delete("content-length");
  return new Response(upstream.body, { status: upstream.status, statusText: upstream.statusText, headers: out });
}
"#;

const SVELTEKIT_DISPATCH: &str = r#"const server = new Server(manifest);
const serverReady = server.init({ env: APP_ENV });

async function dispatch(request) {
  await serverReady;
  return server.respond(request, {
    platform: {},
    getClientAddress: () => (request.headers.get("x-forwarded-for") || "127.0.0.1").split(",")[0].trim(),
  });
}
"#;

const REACT_ROUTER_DISPATCH: &str = r#"const requestHandler = createRequestHandler(build, "production");

async function dispatch(request) {
  return requestHandler(request, { env: APP_ENV });
}
"#;

const HONO_DISPATCH: &str = r#"async function dispatch(request) {
  return app.fetch(request, APP_ENV);
}
"#;

const HANDLE: &str = r#"
async function handle(event) {
  const incoming = toRequest(event);
  const routed = applyRouting(incoming.url);
  if (routed.redirect) return routed.redirect;
  const request = new Request(routed.url, {
    method: incoming.method,
    headers: incoming.headers,
    body: incoming.body,
    duplex: "half",
  });
  const response = await dispatch(request);
  const extra = routeHeaders(incoming.url.pathname);
  if (!extra.length) return response;
  const headers = new Headers(response.headers);
  for (const [key, value] of extra) headers.append(key, value);
  return new Response(response.body, { status: response.status, statusText: response.statusText, headers });
}

function isText(contentType) {
  const essence = (contentType || "").split(";")[0].trim().toLowerCase();
  return essence.startsWith("text/") || essence.endsWith("+json") || essence.endsWith("+xml") || TEXT_TYPES.includes(essence);
}

function splitHeaders(response) {
  const headers = {};
  const cookies = typeof response.headers.getSetCookie === "function" ? response.headers.getSetCookie() : [];
  response.headers.forEach((value, key) => {
    if (key !== "set-cookie") headers[key] = value;
  });
  return { headers, cookies };
}
"#;

const RESPONSE: &str = r#"
async function fromResponse(response, event) {
  const { headers, cookies } = splitHeaders(response);
  const bytes = Buffer.from(await response.arrayBuffer());
  const out = { statusCode: response.status, headers, body: "", isBase64Encoded: false };
  if (bytes.length) {
    let text = null;
    if (isText(response.headers.get("content-type"))) {
      try {
        text = new TextDecoder("utf-8", { fatal: true }).decode(bytes);
      } catch {
        text = null;
      }
    }
    if (text === null) {
      out.body = bytes.toString("base64");
      out.isBase64Encoded = true;
    } else {
      out.body = text;
    }
  }
  if (cookies.length) {
    if (isUrlEvent(event)) out.cookies = cookies;
    else out.multiValueHeaders = { "set-cookie": cookies };
  }
  return out;
}
"#;

const BUFFERED_EXPORT: &str = r#"
export const handler = async (event) => fromResponse(await handle(event), event);
"#;

const STREAMING_EXPORT: &str = r#"
export const handler = awslambda.streamifyResponse(async (event, responseStream) => {
  const response = await handle(event);
  const { headers, cookies } = splitHeaders(response);
  const stream = awslambda.HttpResponseStream.from(responseStream, { statusCode: response.status, headers, cookies });
  if (response.body) {
    const reader = response.body.getReader();
    for (;;) {
      const { done, value } = await reader.read();
      if (done) break;
      stream.write(value);
    }
  }
  stream.end();
});
"#;
