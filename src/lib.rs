// groupcast: workspace root.
//
// The actual functionality lives in the member crates; this package exists
// to host the integration test suites under tests/integration/.
