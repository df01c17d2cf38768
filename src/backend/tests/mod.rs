//! Unit tests for backend classification and the scripted adapter.
