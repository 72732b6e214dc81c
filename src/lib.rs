// Library root
// -----------
// Client for the SOTA/POTA backend's admin endpoints. The binary
// (`main.rs`) wires these modules into an interactive console.
//
// Module responsibilities:
// - `config`: backend origin, session file location and request timeout.
// - `storage`: durable key/value store for the token and identity.
// - `session`: the single session manager (login, logout, token lookup,
//   change listeners).
// - `api`: request façade for dataset imports, award judgment, metrics,
//   restart and award templates; normalizes every outcome into a value.
// - `model`: result and wire types.
// - `ui`: terminal menus that call `api`/`session` and print results.
pub mod api;
pub mod config;
pub mod model;
pub mod session;
pub mod storage;
pub mod ui;
