pub mod shared {
    pub mod infrastructure {
        pub mod http_client;
        pub mod watermark;
    }
}

pub mod modules {
    pub mod package_updates {
        pub mod core {
            pub mod derive;
            pub mod events;
            pub mod failures;
            pub mod package;
            pub mod ports;
            pub mod version;
        }
        pub mod use_cases {
            pub mod track_failures {
                pub mod tracker;
            }
            pub mod dispatch_updates {
                pub mod engine;
                pub mod fan_out;
                pub mod status;
                pub mod inbound {
                    pub mod http;
                }
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod failure_log_http;
                pub mod handlers;
                pub mod in_memory;
                pub mod sync_db;
            }
        }
    }
}

pub mod shell;
