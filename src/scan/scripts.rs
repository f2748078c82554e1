//! JavaScript evaluated against the engine.
//!
//! Inputs are passed through `arguments`; async scripts resolve through the
//! trailing callback argument. Results of engine calls go through a JSON
//! round trip so properties set to `undefined` are dropped before they reach
//! the aggregation step.

/// Origin allow-list value permitting every origin.
pub const UNSAFE_ALL_ORIGINS: &str = "<unsafe_all_origins>";

/// Origin allow-list value permitting only the page's own origin.
pub const SAME_ORIGIN: &str = "<same_origin>";

/// Key of the object an async engine call resolves with when the engine
/// rejected, in place of its result.
pub const REJECTION_KEY: &str = "engineRejection";

/// Sync. Returns `true` when the two-phase protocol is available.
pub const HAS_RUN_PARTIAL: &str = "return typeof window.axe.runPartial === 'function'";

/// Sync. `arguments[0]`: origin allow-list entry.
pub const CONFIGURE_ALLOWED_ORIGINS: &str = "axe.configure({ allowedOrigins: [arguments[0]] })";

/// Async. Replaces every `iframe[sandbox]` with an attribute-stripped clone
/// and resolves once all clones have loaded.
pub const SANDBOX_BUSTER: &str = concat!(
    "const callback = arguments[arguments.length - 1];",
    "const iframes = Array.from(document.querySelectorAll('iframe[sandbox]'));",
    "const removeSandboxAttr = clone => attr => {",
    "  if (attr.name === 'sandbox') return;",
    "  clone.setAttribute(attr.name, attr.value);",
    "};",
    "const replaceSandboxedIframe = iframe => {",
    "  const clone = document.createElement('iframe');",
    "  const promise = new Promise(loaded => (clone.onload = loaded));",
    "  Array.from(iframe.attributes).forEach(removeSandboxAttr(clone));",
    "  iframe.parentElement.replaceChild(clone, iframe);",
    "  return promise;",
    "};",
    "Promise.all(iframes.map(replaceSandboxedIframe)).then(() => callback(null));",
);

/// Sync. `arguments[0]`: scan context. Returns `[{frameContext, frameSelector}]`.
pub const FRAME_CONTEXTS: &str = concat!(
    "const context = typeof arguments[0] == 'string' ? JSON.parse(arguments[0]) : arguments[0];",
    "return window.axe.utils.getFrameContexts(context);",
);

/// Sync. `arguments[0]`: frame selector. Returns the frame element or null.
pub const SHADOW_SELECT: &str = "return axe.utils.shadowSelect(arguments[0])";

/// Async. `arguments[0]`: scan context, `arguments[1]`: options.
///
/// A rejected run resolves with `{ engineRejection }`.
pub const RUN_PARTIAL: &str = concat!(
    "const callback = arguments[arguments.length - 1];",
    "const context = typeof arguments[0] == 'string' ? JSON.parse(arguments[0]) : arguments[0];",
    "window.axe.runPartial(context, arguments[1])",
    "  .then(res => JSON.parse(JSON.stringify(res)))",
    "  .then(callback)",
    "  .catch(err => callback({ engineRejection: String((err && err.message) || err) }));",
);

/// Sync. `arguments[0]`: next chunk of the serialized partial results.
pub const STORE_CHUNK: &str = concat!(
    "window.partialResults ??= '';",
    "window.partialResults += arguments[0];",
);

/// Async. `arguments[0]`: options. Reads `window.partialResults`.
///
/// A rejected or throwing finish resolves with `{ engineRejection }`.
pub const FINISH_RUN: &str = concat!(
    "const callback = arguments[arguments.length - 1];",
    "new Promise(resolve => resolve(JSON.parse(window.partialResults || '[]')))",
    "  .then(partialResults => axe.finishRun(partialResults, arguments[0]))",
    "  .then(res => JSON.parse(JSON.stringify(res)))",
    "  .then(callback)",
    "  .catch(err => callback({ engineRejection: String((err && err.message) || err) }));",
);

/// Async. `arguments[0]`: scan context or null, `arguments[1]`: options.
///
/// A rejected run resolves with `{ errorMessage }` instead of hanging until
/// the script timeout.
pub const RUN: &str = concat!(
    "const callback = arguments[arguments.length - 1];",
    "let context = typeof arguments[0] === 'string' ? JSON.parse(arguments[0]) : arguments[0];",
    "context = context || document;",
    "axe.run(context, arguments[1])",
    "  .then(res => JSON.parse(JSON.stringify(res)))",
    "  .then(callback)",
    "  .catch(err => callback({ errorMessage: String((err && err.message) || err) }));",
);
