//! Protocol types generated from `proto/provider.proto` by the build script.

tonic::include_proto!("provider.v1");
