pub mod visit_request;
